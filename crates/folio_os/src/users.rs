#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use folio_contracts::identity::{Email, Identity, UserId};
use folio_contracts::permissions::{PermissionGrants, PermissionMatrix, PermissionPatch};
use folio_contracts::{ContractViolation, MonotonicTimeNs};
use folio_storage::repo::{AuthUsersRepo, UserPermissionsRepo};
use folio_storage::store::StorageError;
use serde::Serialize;
use tracing::{info, warn};

use crate::notify::{Notification, Notifier};
use crate::permissions::{PermissionError, PermissionStore};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UserAdminError {
    #[error("Please fill in all fields")]
    MissingFields,
    #[error(transparent)]
    Permission(#[from] PermissionError),
    #[error(transparent)]
    Contract(#[from] ContractViolation),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// An identity with its permission row, if it has one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManagedUser {
    pub identity: Identity,
    pub permissions: Option<PermissionMatrix>,
}

/// Super-admin view over every identity. All operations check the caller's
/// loaded matrix first.
#[derive(Debug, Default)]
pub struct UserManager {
    users: Vec<ManagedUser>,
    notices: Notifier,
}

impl UserManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[ManagedUser] {
        &self.users
    }

    pub fn list<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &B,
        perms: &PermissionStore,
    ) -> Result<&[ManagedUser], UserAdminError> {
        match fetch_users(backend, perms) {
            Ok(users) => {
                self.users = users;
                Ok(&self.users)
            }
            Err(err) => {
                warn!(error = %err, "user list failed");
                self.notices.error("Failed to fetch users");
                Err(err)
            }
        }
    }

    /// Creates an identity and gives it the conservative default matrix.
    /// A failed permission insert leaves the identity in place without a row.
    pub fn create_user<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &mut B,
        perms: &PermissionStore,
        email: &str,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Identity, UserAdminError> {
        if email.trim().is_empty() || password.is_empty() {
            self.notices.error(UserAdminError::MissingFields.to_string());
            return Err(UserAdminError::MissingFields);
        }
        let result = try_create(backend, perms, email, password, now);
        match &result {
            Ok(identity) => {
                info!(user_id = %identity.user_id, "user created");
                self.notices.success("User created successfully");
                let _ = self.list(&*backend, perms);
            }
            Err(err) => {
                warn!(error = %err, "user create failed");
                self.notices.error("Failed to create user");
            }
        }
        result
    }

    pub fn delete_user<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &mut B,
        perms: &PermissionStore,
        user_id: &UserId,
    ) -> Result<(), UserAdminError> {
        let result = require_super_admin(perms)
            .and_then(|actor| Ok(backend.delete_auth_user_row(actor, user_id)?));
        match &result {
            Ok(()) => {
                info!(user_id = %user_id, "user deleted");
                self.users.retain(|u| &u.identity.user_id != user_id);
                self.notices.success("User deleted successfully");
            }
            Err(err) => {
                warn!(user_id = %user_id, error = %err, "user delete failed");
                self.notices.error("Failed to delete user");
            }
        }
        result
    }

    /// Edits another identity's matrix through the permission store, which
    /// owns the self-modification guard and its notifications.
    pub fn update_permissions<B: AuthUsersRepo + UserPermissionsRepo>(
        &mut self,
        backend: &mut B,
        perms: &mut PermissionStore,
        target: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, UserAdminError> {
        let row = perms.update_permissions(backend, target, patch, now)?;
        if let Some(user) = self.users.iter_mut().find(|u| &u.identity.user_id == target) {
            user.permissions = Some(row.clone());
        }
        Ok(row)
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notices.drain()
    }
}

fn require_super_admin(perms: &PermissionStore) -> Result<&UserId, UserAdminError> {
    let actor = perms.identity().ok_or(PermissionError::NotSignedIn)?;
    if !perms.is_super_admin() {
        return Err(PermissionError::NotSuperAdmin.into());
    }
    Ok(actor)
}

fn fetch_users<B: AuthUsersRepo + UserPermissionsRepo>(
    backend: &B,
    perms: &PermissionStore,
) -> Result<Vec<ManagedUser>, UserAdminError> {
    let actor = require_super_admin(perms)?;
    let mut rows: BTreeMap<UserId, PermissionMatrix> = backend
        .permission_rows_for(actor)?
        .into_iter()
        .map(|row| (row.user_id.clone(), row))
        .collect();
    Ok(backend
        .auth_user_rows()
        .into_iter()
        .map(|identity| ManagedUser {
            permissions: rows.remove(&identity.user_id),
            identity,
        })
        .collect())
}

fn try_create<B: AuthUsersRepo + UserPermissionsRepo>(
    backend: &mut B,
    perms: &PermissionStore,
    email: &str,
    password: &str,
    now: MonotonicTimeNs,
) -> Result<Identity, UserAdminError> {
    let actor = require_super_admin(perms)?.clone();
    let email = Email::new(email)?;
    let identity = backend.create_auth_user_row(&email, password, now)?;
    if let Err(err) = backend.insert_permission_row(
        &actor,
        &identity.user_id,
        PermissionGrants::conservative_default(),
        now,
    ) {
        warn!(user_id = %identity.user_id, error = %err, "default permissions not created");
    }
    Ok(identity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotificationKind;
    use crate::permissions::provision_permissions;
    use crate::test_support::{seed_identity, seed_super_admin, PASSWORD};
    use folio_contracts::permissions::{AreaAccess, ContentArea};
    use folio_storage::store::PortfolioStore;

    fn admin_session(s: &mut PortfolioStore) -> (UserId, PermissionStore) {
        let admin = seed_super_admin(s, "admin@example.com");
        let mut perms = PermissionStore::new();
        perms.load_permissions(&*s, &admin);
        (admin, perms)
    }

    #[test]
    fn at_users_01_list_joins_identities_with_rows() {
        let mut s = PortfolioStore::new_in_memory();
        let (_, perms) = admin_session(&mut s);
        let viewer = seed_identity(&mut s, "viewer@example.com");
        provision_permissions(&mut s, &viewer, MonotonicTimeNs(2));
        seed_identity(&mut s, "bare@example.com");

        let mut manager = UserManager::new();
        let users = manager.list(&s, &perms).unwrap();
        assert_eq!(users.len(), 3);
        let bare = users
            .iter()
            .find(|u| u.identity.email.as_str() == "bare@example.com")
            .unwrap();
        assert!(bare.permissions.is_none());
        let viewer_row = users
            .iter()
            .find(|u| u.identity.user_id == viewer)
            .and_then(|u| u.permissions.as_ref())
            .unwrap();
        assert!(!viewer_row.is_super_admin);
    }

    #[test]
    fn at_users_02_create_provisions_conservative_default() {
        let mut s = PortfolioStore::new_in_memory();
        let (_, perms) = admin_session(&mut s);
        let mut manager = UserManager::new();

        assert_eq!(
            manager.create_user(&mut s, &perms, "", PASSWORD, MonotonicTimeNs(2)),
            Err(UserAdminError::MissingFields)
        );
        let created = manager
            .create_user(&mut s, &perms, "new@example.com", PASSWORD, MonotonicTimeNs(3))
            .unwrap();
        let notes = manager.drain_notifications();
        assert_eq!(notes[0].message, "Please fill in all fields");
        assert_eq!(notes[1].kind, NotificationKind::Success);
        assert_eq!(notes[1].message, "User created successfully");

        let row = manager
            .users()
            .iter()
            .find(|u| u.identity.user_id == created.user_id)
            .and_then(|u| u.permissions.clone())
            .unwrap();
        assert_eq!(row.grants(), PermissionGrants::conservative_default());
    }

    #[test]
    fn at_users_03_non_admin_is_rejected() {
        let mut s = PortfolioStore::new_in_memory();
        seed_super_admin(&mut s, "admin@example.com");
        let viewer = seed_identity(&mut s, "viewer@example.com");
        provision_permissions(&mut s, &viewer, MonotonicTimeNs(2));
        let mut perms = PermissionStore::new();
        perms.load_permissions(&s, &viewer);

        let mut manager = UserManager::new();
        assert_eq!(
            manager.list(&s, &perms).map(|u| u.len()),
            Err(UserAdminError::Permission(PermissionError::NotSuperAdmin))
        );
        assert!(manager
            .create_user(&mut s, &perms, "x@example.com", PASSWORD, MonotonicTimeNs(3))
            .is_err());
        assert_eq!(manager.drain_notifications()[1].message, "Failed to create user");
    }

    #[test]
    fn at_users_04_delete_removes_identity_and_row() {
        let mut s = PortfolioStore::new_in_memory();
        let (admin, perms) = admin_session(&mut s);
        let mut manager = UserManager::new();
        let created = manager
            .create_user(&mut s, &perms, "gone@example.com", PASSWORD, MonotonicTimeNs(2))
            .unwrap();
        manager
            .delete_user(&mut s, &perms, &created.user_id)
            .unwrap();
        assert!(s.auth_user_row(&created.user_id).is_none());
        assert!(s
            .permission_row_for(Some(&admin), &created.user_id)
            .unwrap()
            .is_none());
        assert!(manager.users().iter().all(|u| u.identity.user_id != created.user_id));

        // an admin cannot delete itself
        assert!(manager.delete_user(&mut s, &perms, &admin).is_err());
    }

    #[test]
    fn at_users_05_permission_edit_goes_through_store_guard() {
        let mut s = PortfolioStore::new_in_memory();
        let (admin, mut perms) = admin_session(&mut s);
        let mut manager = UserManager::new();
        let created = manager
            .create_user(&mut s, &perms, "ed@example.com", PASSWORD, MonotonicTimeNs(2))
            .unwrap();

        let patch = PermissionPatch::default().with_area(ContentArea::Team, AreaAccess::FULL);
        let row = manager
            .update_permissions(&mut s, &mut perms, &created.user_id, &patch, MonotonicTimeNs(3))
            .unwrap();
        assert!(row.has_write(ContentArea::Team));

        assert_eq!(
            manager.update_permissions(&mut s, &mut perms, &admin, &patch, MonotonicTimeNs(4)),
            Err(UserAdminError::Permission(PermissionError::SelfModification))
        );
        let last = perms.drain_notifications().pop().unwrap();
        assert_eq!(last.message, "You cannot modify your own permissions");
    }
}
