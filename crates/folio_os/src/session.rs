#![forbid(unsafe_code)]

use std::collections::VecDeque;

use folio_contracts::identity::{AuthStateEvent, Email, Identity, Session, MIN_PASSWORD_LEN};
use folio_contracts::{ContractViolation, MonotonicTimeNs};
use folio_storage::repo::AuthUsersRepo;
use folio_storage::store::StorageError;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid login credentials")]
    InvalidCredentials,
    #[error("not signed in")]
    NotSignedIn,
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {min} characters long")]
    PasswordTooShort { min: usize },
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for AuthError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidCredentials => AuthError::InvalidCredentials,
            other => AuthError::Storage(other),
        }
    }
}

/// Current session plus the auth-state events not yet delivered to
/// subscribers.
#[derive(Debug, Default)]
pub struct SessionProvider {
    current: Option<Session>,
    pending: VecDeque<AuthStateEvent>,
}

impl SessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sign_in<B: AuthUsersRepo>(
        &mut self,
        backend: &mut B,
        email: &str,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Session, AuthError> {
        let email = Email::new(email).map_err(|_| AuthError::InvalidCredentials)?;
        let identity = backend.verify_credentials_row(&email, password)?;
        let session = backend.issue_session_row(&identity.user_id, now)?;
        info!(user_id = %identity.user_id, "signed in");
        self.current = Some(session.clone());
        self.pending
            .push_back(AuthStateEvent::SignedIn(session.clone()));
        Ok(session)
    }

    /// Adopts a previously issued session by its access token.
    pub fn restore<B: AuthUsersRepo>(&mut self, backend: &B, access_token: &str) -> Option<&Session> {
        self.current = backend.session_row_by_token(access_token);
        self.current.as_ref()
    }

    /// Revokes the current session. Returns false when nobody was signed in.
    pub fn sign_out<B: AuthUsersRepo>(&mut self, backend: &mut B) -> bool {
        let Some(session) = self.current.take() else {
            return false;
        };
        backend.revoke_session_row(&session.access_token);
        debug!(user_id = %session.user_id(), "signed out");
        self.pending.push_back(AuthStateEvent::SignedOut {
            user_id: session.identity.user_id,
        });
        true
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn current_identity(&self) -> Option<&Identity> {
        self.current.as_ref().map(|s| &s.identity)
    }

    pub fn drain_events(&mut self) -> Vec<AuthStateEvent> {
        self.pending.drain(..).collect()
    }

    pub fn change_password<B: AuthUsersRepo>(
        &self,
        backend: &mut B,
        current_password: &str,
        new_password: &str,
        confirm_password: &str,
        now: MonotonicTimeNs,
    ) -> Result<(), AuthError> {
        let identity = self.current_identity().ok_or(AuthError::NotSignedIn)?;
        if new_password != confirm_password {
            return Err(AuthError::PasswordMismatch);
        }
        if new_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::PasswordTooShort {
                min: MIN_PASSWORD_LEN,
            });
        }
        backend.verify_credentials_row(&identity.email, current_password)?;
        backend.set_auth_password_row(&identity.user_id, new_password, now)?;
        info!(user_id = %identity.user_id, "password changed");
        Ok(())
    }
}
