#![forbid(unsafe_code)]

use folio_contracts::identity::{AuthStateEvent, Session};
use folio_contracts::MonotonicTimeNs;
use folio_storage::repo::{AuthUsersRepo, UserPermissionsRepo};

use crate::permissions::{provision_permissions, PermissionStore};
use crate::session::{AuthError, SessionProvider};

/// The signed-in side of the app: session plus the permission matrix that
/// follows it. Built by `init`, dropped back to anonymous by `teardown`.
#[derive(Debug, Default)]
pub struct PortalContext {
    pub session: SessionProvider,
    pub permissions: PermissionStore,
}

impl PortalContext {
    pub fn init() -> Self {
        Self::default()
    }

    pub fn sign_in<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &mut B,
        email: &str,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Session, AuthError> {
        let session = self.session.sign_in(backend, email, password, now)?;
        self.dispatch_events(backend, now);
        Ok(session)
    }

    pub fn sign_out<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &mut B,
        now: MonotonicTimeNs,
    ) {
        self.session.sign_out(backend);
        self.dispatch_events(backend, now);
    }

    /// Picks up an existing session by token and loads its permissions.
    /// No provisioning happens here: that ran when the session was issued.
    pub fn restore<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &B,
        access_token: &str,
    ) -> Option<Session> {
        let session = self.session.restore(backend, access_token)?.clone();
        self.permissions
            .load_permissions(backend, session.user_id());
        Some(session)
    }

    fn dispatch_events<B: UserPermissionsRepo>(&mut self, backend: &mut B, now: MonotonicTimeNs) {
        for event in self.session.drain_events() {
            match event {
                AuthStateEvent::SignedIn(session) => {
                    provision_permissions(backend, session.user_id(), now);
                    self.permissions
                        .load_permissions(&*backend, session.user_id());
                }
                AuthStateEvent::SignedOut { .. } => self.teardown(),
            }
        }
    }

    pub fn teardown(&mut self) {
        self.permissions.teardown();
    }
}
