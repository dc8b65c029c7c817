#![forbid(unsafe_code)]

use folio_contracts::identity::UserId;
use folio_contracts::permissions::{
    AccessLevel, ContentArea, PermissionGrants, PermissionMatrix, PermissionPatch,
};
use folio_contracts::MonotonicTimeNs;
use folio_storage::repo::UserPermissionsRepo;
use folio_storage::store::StorageError;
use tracing::{debug, info, warn};

use crate::notify::{Notification, Notifier};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PermissionError {
    #[error("You cannot modify your own permissions")]
    SelfModification,
    #[error("only super-admins can manage permissions")]
    NotSuperAdmin,
    #[error("not signed in")]
    NotSignedIn,
    #[error("no {} access", .area.as_str())]
    Denied { area: ContentArea },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// What first-sign-in provisioning did for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Existing,
    CreatedSuperAdmin,
    CreatedDefault,
    /// Lookup or insert failed; the identity is left without a matrix.
    Failed,
}

/// Ensures `identity` has a permission row. The first identity ever to sign
/// in becomes super-admin; everyone after gets the conservative default.
/// Failures are logged and never surfaced.
pub fn provision_permissions<B: UserPermissionsRepo>(
    backend: &mut B,
    identity: &UserId,
    now: MonotonicTimeNs,
) -> ProvisionOutcome {
    match backend.permission_row_for(Some(identity), identity) {
        Ok(Some(_)) => return ProvisionOutcome::Existing,
        Ok(None) => {}
        Err(err) => {
            warn!(user_id = %identity, error = %err, "permission lookup failed during provisioning");
            return ProvisionOutcome::Failed;
        }
    }
    let is_first = match backend.permission_rows_exist() {
        Ok(exists) => !exists,
        Err(err) => {
            warn!(user_id = %identity, error = %err, "permission count failed during provisioning");
            return ProvisionOutcome::Failed;
        }
    };
    let (grants, outcome) = if is_first {
        (
            PermissionGrants::super_admin(),
            ProvisionOutcome::CreatedSuperAdmin,
        )
    } else {
        (
            PermissionGrants::conservative_default(),
            ProvisionOutcome::CreatedDefault,
        )
    };
    match backend.insert_permission_row(identity, identity, grants, now) {
        Ok(_) => {
            info!(user_id = %identity, ?outcome, "permissions provisioned");
            outcome
        }
        Err(err) => {
            warn!(user_id = %identity, error = %err, "permission insert failed during provisioning");
            ProvisionOutcome::Failed
        }
    }
}

/// The signed-in identity's permission matrix, as last loaded. `loading`
/// stays true until a load for the current identity has resolved.
#[derive(Debug)]
pub struct PermissionStore {
    identity: Option<UserId>,
    matrix: Option<PermissionMatrix>,
    loading: bool,
    notices: Notifier,
}

impl Default for PermissionStore {
    fn default() -> Self {
        Self {
            identity: None,
            matrix: None,
            loading: true,
            notices: Notifier::default(),
        }
    }
}

impl PermissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches the matrix for `identity`. A missing row or failed fetch
    /// leaves every check false.
    pub fn load_permissions<B: UserPermissionsRepo>(
        &mut self,
        backend: &B,
        identity: &UserId,
    ) -> Option<&PermissionMatrix> {
        self.identity = Some(identity.clone());
        self.matrix = match backend.permission_row_for(Some(identity), identity) {
            Ok(row) => row,
            Err(err) => {
                warn!(user_id = %identity, error = %err, "permission load failed");
                None
            }
        };
        self.loading = false;
        self.matrix.as_ref()
    }

    /// Reloads the matrix of the current identity.
    pub fn refetch<B: UserPermissionsRepo>(&mut self, backend: &B) -> Option<&PermissionMatrix> {
        match self.identity.clone() {
            Some(identity) => self.load_permissions(backend, &identity),
            None => None,
        }
    }

    pub fn teardown(&mut self) {
        self.identity = None;
        self.matrix = None;
        self.loading = true;
    }

    pub fn identity(&self) -> Option<&UserId> {
        self.identity.as_ref()
    }

    pub fn matrix(&self) -> Option<&PermissionMatrix> {
        self.matrix.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn is_super_admin(&self) -> bool {
        self.matrix.as_ref().map(|m| m.is_super_admin).unwrap_or(false)
    }

    pub fn has_read(&self, area: ContentArea) -> bool {
        self.matrix.as_ref().map(|m| m.has_read(area)).unwrap_or(false)
    }

    pub fn has_write(&self, area: ContentArea) -> bool {
        self.matrix.as_ref().map(|m| m.has_write(area)).unwrap_or(false)
    }

    pub fn access_level(&self, area: ContentArea) -> AccessLevel {
        self.matrix
            .as_ref()
            .map(|m| m.access_level(area))
            .unwrap_or(AccessLevel::Hidden)
    }

    pub fn require_read(&self, area: ContentArea) -> Result<(), PermissionError> {
        if self.has_read(area) {
            Ok(())
        } else {
            Err(PermissionError::Denied { area })
        }
    }

    /// Upserts `patch` onto `target`'s row. The acting identity must be a
    /// super-admin and may never target itself; a rejection is a no-op with
    /// an error notification.
    pub fn update_permissions<B: UserPermissionsRepo>(
        &mut self,
        backend: &mut B,
        target: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, PermissionError> {
        let result = self.try_update(backend, target, patch, now);
        match &result {
            Ok(_) => {
                info!(target_user = %target, "permissions updated");
                self.notices.success("Permissions updated successfully");
            }
            Err(err) => {
                debug!(target_user = %target, error = %err, "permission update rejected");
                match err {
                    PermissionError::SelfModification => self.notices.error(err.to_string()),
                    _ => self.notices.error("Failed to update permissions"),
                }
            }
        }
        result
    }

    fn try_update<B: UserPermissionsRepo>(
        &self,
        backend: &mut B,
        target: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, PermissionError> {
        let actor = self.identity.as_ref().ok_or(PermissionError::NotSignedIn)?;
        if actor == target {
            return Err(PermissionError::SelfModification);
        }
        if !self.is_super_admin() {
            return Err(PermissionError::NotSuperAdmin);
        }
        Ok(backend.upsert_permission_row(actor, target, patch, now)?)
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notices.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_identity, Flaky};
    use folio_contracts::permissions::AreaAccess;
    use folio_storage::store::PortfolioStore;

    #[test]
    fn at_perm_01_no_row_means_every_check_false() {
        let mut s = PortfolioStore::new_in_memory();
        let user = seed_identity(&mut s, "a@example.com");
        let mut perms = PermissionStore::new();
        assert!(perms.load_permissions(&s, &user).is_none());
        for area in ContentArea::ALL {
            assert!(!perms.has_read(area));
            assert!(!perms.has_write(area));
            assert_eq!(perms.access_level(area), AccessLevel::Hidden);
        }
    }

    #[test]
    fn at_perm_02_first_identity_super_admin_later_conservative() {
        let mut s = PortfolioStore::new_in_memory();
        let first = seed_identity(&mut s, "first@example.com");
        let second = seed_identity(&mut s, "second@example.com");

        assert_eq!(
            provision_permissions(&mut s, &first, MonotonicTimeNs(1)),
            ProvisionOutcome::CreatedSuperAdmin
        );
        assert_eq!(
            provision_permissions(&mut s, &second, MonotonicTimeNs(2)),
            ProvisionOutcome::CreatedDefault
        );
        assert_eq!(
            provision_permissions(&mut s, &second, MonotonicTimeNs(3)),
            ProvisionOutcome::Existing
        );

        let mut perms = PermissionStore::new();
        perms.load_permissions(&s, &first);
        assert!(perms.is_super_admin());
        for area in ContentArea::ALL {
            assert!(perms.has_write(area));
        }

        perms.load_permissions(&s, &second);
        let m = perms.matrix().unwrap();
        assert!(!m.is_super_admin);
        for area in [
            ContentArea::Analytics,
            ContentArea::Hero,
            ContentArea::Projects,
            ContentArea::Team,
        ] {
            assert!(m.has_read(area));
            assert!(!m.has_write(area));
        }
        assert!(!m.has_read(ContentArea::Settings));
        assert!(!m.has_write(ContentArea::Settings));
    }

    #[test]
    fn at_perm_03_provisioning_failure_is_swallowed() {
        let mut s = PortfolioStore::new_in_memory();
        let user = seed_identity(&mut s, "a@example.com");
        let mut flaky = Flaky::failing(s);
        assert_eq!(
            provision_permissions(&mut flaky, &user, MonotonicTimeNs(1)),
            ProvisionOutcome::Failed
        );
        flaky.fail = false;
        let mut perms = PermissionStore::new();
        assert!(perms.load_permissions(&flaky, &user).is_none());
    }

    #[test]
    fn at_perm_04_self_modification_is_a_noop_with_error() {
        let mut s = PortfolioStore::new_in_memory();
        let admin = seed_identity(&mut s, "admin@example.com");
        provision_permissions(&mut s, &admin, MonotonicTimeNs(1));
        let mut perms = PermissionStore::new();
        perms.load_permissions(&s, &admin);

        let before = perms.matrix().cloned();
        let patch = PermissionPatch::default().with_super_admin(false);
        let err = perms
            .update_permissions(&mut s, &admin, &patch, MonotonicTimeNs(2))
            .unwrap_err();
        assert_eq!(err, PermissionError::SelfModification);
        assert_eq!(perms.refetch(&s).cloned(), before);
        let notes = perms.drain_notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].message, "You cannot modify your own permissions");
    }

    #[test]
    fn at_perm_05_grant_reaches_target_on_next_load() {
        let mut s = PortfolioStore::new_in_memory();
        let admin = seed_identity(&mut s, "admin@example.com");
        let editor = seed_identity(&mut s, "editor@example.com");
        provision_permissions(&mut s, &admin, MonotonicTimeNs(1));
        provision_permissions(&mut s, &editor, MonotonicTimeNs(2));

        let mut editor_perms = PermissionStore::new();
        editor_perms.load_permissions(&s, &editor);
        assert_eq!(
            editor_perms.access_level(ContentArea::Team),
            AccessLevel::ReadOnly
        );

        let mut admin_perms = PermissionStore::new();
        admin_perms.load_permissions(&s, &admin);
        admin_perms
            .update_permissions(
                &mut s,
                &editor,
                &PermissionPatch::default().with_area(ContentArea::Team, AreaAccess::FULL),
                MonotonicTimeNs(3),
            )
            .unwrap();

        // no live push: the stale matrix stays until reloaded
        assert_eq!(
            editor_perms.access_level(ContentArea::Team),
            AccessLevel::ReadOnly
        );
        editor_perms.refetch(&s);
        assert_eq!(
            editor_perms.access_level(ContentArea::Team),
            AccessLevel::ReadWrite
        );
    }

    #[test]
    fn at_perm_06_non_admin_cannot_update() {
        let mut s = PortfolioStore::new_in_memory();
        let admin = seed_identity(&mut s, "admin@example.com");
        let a = seed_identity(&mut s, "a@example.com");
        let b = seed_identity(&mut s, "b@example.com");
        provision_permissions(&mut s, &admin, MonotonicTimeNs(1));
        provision_permissions(&mut s, &a, MonotonicTimeNs(1));
        let mut perms = PermissionStore::new();
        perms.load_permissions(&s, &a);
        assert_eq!(
            perms.update_permissions(
                &mut s,
                &b,
                &PermissionPatch::default().with_super_admin(true),
                MonotonicTimeNs(2)
            ),
            Err(PermissionError::NotSuperAdmin)
        );
    }

    #[test]
    fn at_perm_07_teardown_clears_matrix() {
        let mut s = PortfolioStore::new_in_memory();
        let admin = seed_identity(&mut s, "admin@example.com");
        provision_permissions(&mut s, &admin, MonotonicTimeNs(1));
        let mut perms = PermissionStore::new();
        assert!(perms.loading());
        perms.load_permissions(&s, &admin);
        assert!(!perms.loading());
        assert!(perms.has_read(ContentArea::Settings));
        perms.teardown();
        assert!(perms.loading());
        assert!(!perms.has_read(ContentArea::Settings));
        assert!(perms.refetch(&s).is_none());
    }
}
