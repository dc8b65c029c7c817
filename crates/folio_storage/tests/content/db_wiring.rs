#![forbid(unsafe_code)]

use folio_contracts::content::{
    AdminSettingInput, AdminSettingKind, AdminSettingPatch, HeroContentKind, HeroContentPatch,
    PortfolioSettingsInput, PortfolioSettingsKind, ProjectInput, ProjectKind, SkillInput,
    SkillKind, SkillPatch, TeamMemberInput, TeamMemberKind,
};
use folio_contracts::identity::{Email, UserId};
use folio_contracts::permissions::{AreaAccess, ContentArea, PermissionGrants, PermissionPatch};
use folio_contracts::{MonotonicTimeNs, RecordId};
use folio_storage::repo::{AuthUsersRepo, ContentTablesRepo};
use folio_storage::store::{PortfolioStore, StorageError};

fn seed_super_admin(store: &mut PortfolioStore) -> UserId {
    let user_id = store
        .create_auth_user_row(
            &Email::new("admin@example.com").unwrap(),
            "password-123",
            MonotonicTimeNs(1),
        )
        .unwrap()
        .user_id;
    store
        .insert_permission_row(&user_id, &user_id, PermissionGrants::super_admin(), MonotonicTimeNs(1))
        .unwrap();
    user_id
}

fn seed_viewer(store: &mut PortfolioStore, email: &str) -> UserId {
    let user_id = store
        .create_auth_user_row(&Email::new(email).unwrap(), "password-123", MonotonicTimeNs(1))
        .unwrap()
        .user_id;
    store
        .insert_permission_row(
            &user_id,
            &user_id,
            PermissionGrants::conservative_default(),
            MonotonicTimeNs(1),
        )
        .unwrap();
    user_id
}

fn project(title: &str) -> ProjectInput {
    ProjectInput {
        title: title.to_string(),
        description: format!("{title} description"),
        technologies: vec!["Rust".to_string()],
        year: "2024".to_string(),
        ..ProjectInput::default()
    }
}

fn skill(name: &str, category: &str, level: u8) -> SkillInput {
    SkillInput {
        name: name.to_string(),
        level,
        category: category.to_string(),
    }
}

#[test]
fn at_content_db_01_projects_list_newest_first() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    s.insert_content::<ProjectKind>(Some(&admin), project("Old"), MonotonicTimeNs(10))
        .unwrap();
    s.insert_content::<ProjectKind>(Some(&admin), project("New"), MonotonicTimeNs(20))
        .unwrap();

    let titles: Vec<String> = s
        .list_content_rows::<ProjectKind>()
        .unwrap()
        .into_iter()
        .map(|p| p.fields.title)
        .collect();
    assert_eq!(titles, vec!["New".to_string(), "Old".to_string()]);
}

#[test]
fn at_content_db_02_write_requires_area_write() {
    let mut s = PortfolioStore::new_in_memory();
    seed_super_admin(&mut s);
    let viewer = seed_viewer(&mut s, "viewer@example.com");

    assert!(matches!(
        s.insert_content::<ProjectKind>(Some(&viewer), project("Nope"), MonotonicTimeNs(5)),
        Err(StorageError::PolicyViolation {
            table: "projects",
            ..
        })
    ));
    assert!(matches!(
        s.insert_content::<TeamMemberKind>(None, TeamMemberInput::default(), MonotonicTimeNs(5)),
        Err(StorageError::PolicyViolation { .. })
    ));
    assert!(s.list_content_rows::<ProjectKind>().unwrap().is_empty());
}

#[test]
fn at_content_db_03_granted_team_write_allows_team_only() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    let editor = seed_viewer(&mut s, "editor@example.com");
    s.upsert_permission_row(
        &admin,
        &editor,
        &PermissionPatch::default().with_area(ContentArea::Team, AreaAccess::FULL),
        MonotonicTimeNs(2),
    )
    .unwrap();

    let member = TeamMemberInput {
        name: "Ada".to_string(),
        role: "Engineer".to_string(),
        bio: "Writes compilers".to_string(),
        ..TeamMemberInput::default()
    };
    let row = s
        .insert_content::<TeamMemberKind>(Some(&editor), member, MonotonicTimeNs(3))
        .unwrap();
    assert_eq!(row.fields.name, "Ada");
    assert!(s
        .insert_content::<ProjectKind>(Some(&editor), project("X"), MonotonicTimeNs(3))
        .is_err());
}

#[test]
fn at_content_db_04_skills_ordered_and_patched() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    s.insert_content::<SkillKind>(Some(&admin), skill("Git", "Tools", 90), MonotonicTimeNs(1))
        .unwrap();
    let rust = s
        .insert_content::<SkillKind>(Some(&admin), skill("Rust", "Backend", 70), MonotonicTimeNs(2))
        .unwrap();
    s.insert_content::<SkillKind>(Some(&admin), skill("SQL", "Backend", 80), MonotonicTimeNs(3))
        .unwrap();

    s.update_content::<SkillKind>(
        Some(&admin),
        &rust.id,
        SkillPatch {
            level: Some(95),
            ..SkillPatch::default()
        },
        MonotonicTimeNs(4),
    )
    .unwrap();

    let names: Vec<String> = s
        .list_content_rows::<SkillKind>()
        .unwrap()
        .into_iter()
        .map(|k| k.name)
        .collect();
    assert_eq!(names, vec!["Rust", "SQL", "Git"]);
}

#[test]
fn at_content_db_05_update_and_delete_missing_rows_fail() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    let missing = RecordId::new("missing").unwrap();
    assert!(matches!(
        s.update_content::<ProjectKind>(Some(&admin), &missing, project("X"), MonotonicTimeNs(2)),
        Err(StorageError::NotFound { .. })
    ));
    assert!(matches!(
        s.delete_content::<ProjectKind>(Some(&admin), &missing),
        Err(StorageError::NotFound { .. })
    ));
}

#[test]
fn at_content_db_06_invalid_input_is_rejected_before_write() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    assert!(matches!(
        s.insert_content::<SkillKind>(Some(&admin), skill("Rust", "Backend", 150), MonotonicTimeNs(2)),
        Err(StorageError::ContractViolation(_))
    ));
    assert!(s.list_content_rows::<SkillKind>().unwrap().is_empty());
}

#[test]
fn at_content_db_07_singletons_seeded_and_updated() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    s.seed_site_defaults(MonotonicTimeNs(1)).unwrap();

    let hero = s.fetch_singleton_row::<HeroContentKind>().unwrap().unwrap();
    let updated = s
        .update_singleton::<HeroContentKind>(
            Some(&admin),
            &hero.id,
            HeroContentPatch {
                main_heading: Some("Systems Engineer".to_string()),
                ..HeroContentPatch::default()
            },
            MonotonicTimeNs(2),
        )
        .unwrap();
    assert_eq!(updated.main_heading, "Systems Engineer");
    assert_eq!(updated.subtitle, hero.subtitle);

    let settings = s
        .fetch_singleton_row::<PortfolioSettingsKind>()
        .unwrap()
        .unwrap();
    let updated = s
        .update_singleton::<PortfolioSettingsKind>(
            Some(&admin),
            &settings.id,
            PortfolioSettingsInput {
                portfolio_title: "Folio".to_string(),
                contact_email: "me@example.com".to_string(),
                phone: String::new(),
            },
            MonotonicTimeNs(3),
        )
        .unwrap();
    assert_eq!(updated.fields.portfolio_title, "Folio");
    assert_eq!(updated.fields.phone, "");

    // seeding twice keeps the edited rows
    s.seed_site_defaults(MonotonicTimeNs(4)).unwrap();
    assert_eq!(
        s.fetch_singleton_row::<PortfolioSettingsKind>()
            .unwrap()
            .unwrap()
            .fields
            .portfolio_title,
        "Folio"
    );
}

#[test]
fn at_content_db_08_admin_settings_by_key() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    for key in ["site_theme", "maintenance_mode"] {
        s.insert_content::<AdminSettingKind>(
            Some(&admin),
            AdminSettingInput {
                setting_key: key.to_string(),
                setting_value: "off".to_string(),
                description: None,
            },
            MonotonicTimeNs(1),
        )
        .unwrap();
    }
    let keys: Vec<String> = s
        .list_content_rows::<AdminSettingKind>()
        .unwrap()
        .into_iter()
        .map(|r| r.setting_key)
        .collect();
    assert_eq!(keys, vec!["maintenance_mode", "site_theme"]);

    let row = s.admin_setting_row_by_key("site_theme").unwrap().unwrap();
    s.update_content::<AdminSettingKind>(
        Some(&admin),
        &row.id,
        AdminSettingPatch {
            setting_value: Some("dark".to_string()),
            ..AdminSettingPatch::default()
        },
        MonotonicTimeNs(2),
    )
    .unwrap();
    assert_eq!(
        s.admin_setting_row_by_key("site_theme")
            .unwrap()
            .unwrap()
            .setting_value,
        "dark"
    );
}

#[test]
fn at_content_db_10_admin_setting_keys_are_unique() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    let input = AdminSettingInput {
        setting_key: "maintenance_mode".to_string(),
        setting_value: "off".to_string(),
        description: None,
    };
    s.insert_content::<AdminSettingKind>(Some(&admin), input.clone(), MonotonicTimeNs(1))
        .unwrap();
    s.drain_journal();

    let again = s.insert_content::<AdminSettingKind>(
        Some(&admin),
        AdminSettingInput {
            setting_value: "on".to_string(),
            ..input
        },
        MonotonicTimeNs(2),
    );
    assert_eq!(
        again,
        Err(StorageError::DuplicateKey {
            table: "admin_settings.setting_key",
            key: "maintenance_mode".to_string(),
        })
    );
    let rows = s.list_content_rows::<AdminSettingKind>().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].setting_value, "off");
    assert!(s.drain_journal().is_empty());
}

#[test]
fn at_content_db_09_journal_replay_keeps_ids_and_order() {
    let mut s = PortfolioStore::new_in_memory();
    let admin = seed_super_admin(&mut s);
    let kept = s
        .insert_content::<ProjectKind>(Some(&admin), project("Kept"), MonotonicTimeNs(1))
        .unwrap();
    let gone = s
        .insert_content::<ProjectKind>(Some(&admin), project("Gone"), MonotonicTimeNs(2))
        .unwrap();
    s.delete_content::<ProjectKind>(Some(&admin), &gone.id)
        .unwrap();

    let mut replayed = PortfolioStore::new_in_memory();
    for entry in s.drain_journal() {
        replayed.replay_journal_entry(&entry).unwrap();
    }
    let rows = replayed.list_content_rows::<ProjectKind>().unwrap();
    assert_eq!(rows, vec![kept]);
}
