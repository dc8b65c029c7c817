#![forbid(unsafe_code)]

use folio_contracts::analytics::VisitInput;
use folio_contracts::identity::{Email, UserId};
use folio_contracts::permissions::PermissionGrants;
use folio_contracts::MonotonicTimeNs;
use folio_storage::repo::{AnalyticsTablesRepo, AuthUsersRepo};
use folio_storage::store::{PortfolioStore, StorageError};

fn seed_identity(store: &mut PortfolioStore, email: &str, grants: PermissionGrants) -> UserId {
    let user_id = store
        .create_auth_user_row(&Email::new(email).unwrap(), "password-123", MonotonicTimeNs(1))
        .unwrap()
        .user_id;
    store
        .insert_permission_row(&user_id, &user_id, grants, MonotonicTimeNs(1))
        .unwrap();
    user_id
}

#[test]
fn at_analytics_db_01_anonymous_insert_is_open() {
    let mut s = PortfolioStore::new_in_memory();
    let row = s
        .insert_visit_row(
            VisitInput::v1("/projects", Some("agent/1.0".to_string())),
            MonotonicTimeNs(7),
        )
        .unwrap();
    assert_eq!(row.page_path, "/projects");
    assert_eq!(row.created_at, MonotonicTimeNs(7));
}

#[test]
fn at_analytics_db_02_reads_need_analytics_read() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_identity(&mut s, "admin@example.com", PermissionGrants::super_admin());
    let blind = seed_identity(&mut s, "blind@example.com", PermissionGrants::none());
    s.insert_visit_row(VisitInput::v1("/", None), MonotonicTimeNs(1))
        .unwrap();

    assert_eq!(s.visit_rows_for(Some(&admin)).unwrap().len(), 1);
    assert!(matches!(
        s.visit_rows_for(Some(&blind)),
        Err(StorageError::PolicyViolation {
            table: "analytics",
            ..
        })
    ));
    assert!(s.visit_rows_for(None).is_err());
}

#[test]
fn at_analytics_db_03_bad_path_rejected() {
    let mut s = PortfolioStore::new_in_memory();
    assert!(matches!(
        s.insert_visit_row(VisitInput::v1("", None), MonotonicTimeNs(1)),
        Err(StorageError::ContractViolation(_))
    ));
}

#[test]
fn at_analytics_db_04_demo_tables_seed_once() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_identity(&mut s, "admin@example.com", PermissionGrants::super_admin());
    s.seed_demo_analytics().unwrap();
    s.seed_demo_analytics().unwrap();
    assert_eq!(s.demo_traffic_rows_for(Some(&admin)).unwrap().len(), 7);
    assert_eq!(s.demo_project_stat_rows_for(Some(&admin)).unwrap().len(), 4);
}
