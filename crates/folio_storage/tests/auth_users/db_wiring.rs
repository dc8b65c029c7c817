#![forbid(unsafe_code)]

use folio_contracts::identity::Email;
use folio_contracts::MonotonicTimeNs;
use folio_storage::repo::AuthUsersRepo;
use folio_storage::store::{PortfolioStore, StorageError};

fn email(s: &str) -> Email {
    Email::new(s).unwrap()
}

#[test]
fn at_auth_db_01_credentials_verify() {
    let mut s = PortfolioStore::new_in_memory();
    let created = s
        .create_auth_user_row(&email("A@Example.com"), "password-123", MonotonicTimeNs(1))
        .unwrap();
    let verified = s
        .verify_credentials_row(&email("a@example.com"), "password-123")
        .unwrap();
    assert_eq!(created, verified);
    assert_eq!(
        s.verify_credentials_row(&email("a@example.com"), "nope"),
        Err(StorageError::InvalidCredentials)
    );
    assert_eq!(
        s.verify_credentials_row(&email("b@example.com"), "password-123"),
        Err(StorageError::InvalidCredentials)
    );
}

#[test]
fn at_auth_db_02_duplicate_email_rejected() {
    let mut s = PortfolioStore::new_in_memory();
    s.create_auth_user_row(&email("a@example.com"), "password-123", MonotonicTimeNs(1))
        .unwrap();
    assert!(matches!(
        s.create_auth_user_row(&email("a@example.com"), "other-pass", MonotonicTimeNs(2)),
        Err(StorageError::DuplicateKey { .. })
    ));
}

#[test]
fn at_auth_db_03_sessions_issue_and_revoke() {
    let mut s = PortfolioStore::new_in_memory();
    let identity = s
        .create_auth_user_row(&email("a@example.com"), "password-123", MonotonicTimeNs(1))
        .unwrap();
    let session = s
        .issue_session_row(&identity.user_id, MonotonicTimeNs(2))
        .unwrap();
    assert_eq!(
        s.session_row_by_token(&session.access_token)
            .unwrap()
            .user_id(),
        &identity.user_id
    );
    assert!(s.revoke_session_row(&session.access_token));
    assert!(s.session_row_by_token(&session.access_token).is_none());
    assert!(!s.revoke_session_row(&session.access_token));
}

#[test]
fn at_auth_db_04_password_change_takes_effect() {
    let mut s = PortfolioStore::new_in_memory();
    let identity = s
        .create_auth_user_row(&email("a@example.com"), "password-123", MonotonicTimeNs(1))
        .unwrap();
    s.set_auth_password_row(&identity.user_id, "password-456", MonotonicTimeNs(2))
        .unwrap();
    assert!(s
        .verify_credentials_row(&email("a@example.com"), "password-456")
        .is_ok());
    assert!(s
        .verify_credentials_row(&email("a@example.com"), "password-123")
        .is_err());
}
