#![forbid(unsafe_code)]

use folio_contracts::identity::{Email, UserId};
use folio_contracts::permissions::{
    AreaAccess, ContentArea, PermissionGrants, PermissionPatch,
};
use folio_contracts::MonotonicTimeNs;
use folio_storage::store::{PortfolioStore, StorageError};
use folio_storage::repo::{AuthUsersRepo, UserPermissionsRepo};

fn seed_identity(store: &mut PortfolioStore, email: &str) -> UserId {
    store
        .create_auth_user_row(&Email::new(email).unwrap(), "password-123", MonotonicTimeNs(1))
        .unwrap()
        .user_id
}

fn seed_super_admin(store: &mut PortfolioStore, email: &str) -> UserId {
    let user_id = seed_identity(store, email);
    store
        .insert_permission_row(
            &user_id,
            &user_id,
            PermissionGrants::super_admin(),
            MonotonicTimeNs(2),
        )
        .unwrap();
    user_id
}

#[test]
fn at_perm_db_01_first_identity_may_self_insert_super_admin_on_empty_table() {
    let mut s = PortfolioStore::new_in_memory();
    assert!(!s.permission_rows_exist());
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let row = s.permission_row_for(Some(&admin), &admin).unwrap().unwrap();
    assert!(row.is_super_admin);
    assert!(s.permission_rows_exist());
}

#[test]
fn at_perm_db_02_later_identity_cannot_self_insert_super_admin() {
    let mut s = PortfolioStore::new_in_memory();
    seed_super_admin(&mut s, "admin@example.com");
    let late = seed_identity(&mut s, "late@example.com");

    let err = s
        .insert_permission_row(&late, &late, PermissionGrants::super_admin(), MonotonicTimeNs(3))
        .unwrap_err();
    assert!(matches!(err, StorageError::PolicyViolation { .. }));

    let row = s
        .insert_permission_row(
            &late,
            &late,
            PermissionGrants::conservative_default(),
            MonotonicTimeNs(3),
        )
        .unwrap();
    assert!(!row.is_super_admin);
    assert!(row.has_read(ContentArea::Projects));
    assert!(!row.has_write(ContentArea::Projects));
}

#[test]
fn at_perm_db_03_duplicate_row_is_rejected() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let err = s
        .insert_permission_row(&admin, &admin, PermissionGrants::none(), MonotonicTimeNs(4))
        .unwrap_err();
    assert!(matches!(err, StorageError::DuplicateKey { .. }));
}

#[test]
fn at_perm_db_04_rows_visible_to_subject_or_super_admin_only() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let a = seed_identity(&mut s, "a@example.com");
    let b = seed_identity(&mut s, "b@example.com");
    s.insert_permission_row(&a, &a, PermissionGrants::conservative_default(), MonotonicTimeNs(3))
        .unwrap();

    assert!(s.permission_row_for(Some(&a), &a).unwrap().is_some());
    assert!(s.permission_row_for(Some(&admin), &a).unwrap().is_some());
    assert!(matches!(
        s.permission_row_for(Some(&b), &a),
        Err(StorageError::PolicyViolation { .. })
    ));
    assert!(matches!(
        s.permission_row_for(None, &a),
        Err(StorageError::PolicyViolation { .. })
    ));
    assert!(s.permission_rows_for(&a).is_err());
    assert_eq!(s.permission_rows_for(&admin).unwrap().len(), 2);
}

#[test]
fn at_perm_db_05_upsert_by_super_admin_creates_or_patches() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let b = seed_identity(&mut s, "b@example.com");

    let patch = PermissionPatch::default().with_area(ContentArea::Team, AreaAccess::FULL);
    let row = s
        .upsert_permission_row(&admin, &b, &patch, MonotonicTimeNs(5))
        .unwrap();
    assert!(row.has_write(ContentArea::Team));
    assert!(!row.has_read(ContentArea::Hero));

    let patch = PermissionPatch::default().with_area(ContentArea::Hero, AreaAccess::READ_ONLY);
    let row = s
        .upsert_permission_row(&admin, &b, &patch, MonotonicTimeNs(6))
        .unwrap();
    assert!(row.has_write(ContentArea::Team));
    assert!(row.has_read(ContentArea::Hero));
    assert_eq!(row.updated_at, MonotonicTimeNs(6));
}

#[test]
fn at_perm_db_06_self_modification_rejected_even_for_super_admin() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let patch = PermissionPatch::default().with_super_admin(false);
    let err = s
        .upsert_permission_row(&admin, &admin, &patch, MonotonicTimeNs(5))
        .unwrap_err();
    assert!(matches!(err, StorageError::PolicyViolation { .. }));
    let row = s.permission_row_for(Some(&admin), &admin).unwrap().unwrap();
    assert!(row.is_super_admin);
}

#[test]
fn at_perm_db_07_non_admin_cannot_grant() {
    let mut s = PortfolioStore::new_in_memory();
    seed_super_admin(&mut s, "admin@example.com");
    let a = seed_identity(&mut s, "a@example.com");
    let b = seed_identity(&mut s, "b@example.com");
    let patch = PermissionPatch::default().with_area(ContentArea::Team, AreaAccess::FULL);
    assert!(matches!(
        s.upsert_permission_row(&a, &b, &patch, MonotonicTimeNs(5)),
        Err(StorageError::PolicyViolation { .. })
    ));
}

#[test]
fn at_perm_db_08_delete_user_cascades_permission_row() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let b = seed_identity(&mut s, "b@example.com");
    s.insert_permission_row(&admin, &b, PermissionGrants::conservative_default(), MonotonicTimeNs(3))
        .unwrap();

    s.delete_auth_user_row(&admin, &b).unwrap();
    assert!(s.auth_user_row(&b).is_none());
    assert_eq!(s.permission_rows_for(&admin).unwrap().len(), 1);
    assert!(matches!(
        s.delete_auth_user_row(&admin, &admin),
        Err(StorageError::PolicyViolation { .. })
    ));
}

#[test]
fn at_perm_db_09_journal_replay_rebuilds_permissions() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s, "admin@example.com");
    let b = seed_identity(&mut s, "b@example.com");
    let patch = PermissionPatch::default().with_area(ContentArea::Team, AreaAccess::FULL);
    s.upsert_permission_row(&admin, &b, &patch, MonotonicTimeNs(5))
        .unwrap();

    let mut replayed = PortfolioStore::new_in_memory();
    for entry in s.drain_journal() {
        let line = entry.to_line().unwrap();
        let decoded = folio_storage::journal::JournalEntry::from_line(&line).unwrap();
        replayed.replay_journal_entry(&decoded).unwrap();
    }
    assert!(replayed.drain_journal().is_empty());
    let row = replayed.permission_row_for(Some(&b), &b).unwrap().unwrap();
    assert!(row.has_write(ContentArea::Team));
    assert!(replayed
        .verify_credentials_row(&Email::new("b@example.com").unwrap(), "password-123")
        .is_ok());
}
