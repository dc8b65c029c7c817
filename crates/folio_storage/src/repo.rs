#![forbid(unsafe_code)]

use folio_contracts::analytics::{DemoProjectStatRow, DemoTrafficRow, VisitInput, VisitRecord};
use folio_contracts::content::AdminSetting;
use folio_contracts::identity::{Email, Identity, Session, UserId};
use folio_contracts::permissions::{PermissionGrants, PermissionMatrix, PermissionPatch};
use folio_contracts::{MonotonicTimeNs, RecordId};

use crate::store::{PortfolioStore, StorageError, StoredContent, StoredSingleton};

/// Typed repository interface for `auth_users` and issued sessions.
pub trait AuthUsersRepo {
    fn create_auth_user_row(
        &mut self,
        email: &Email,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Identity, StorageError>;
    fn verify_credentials_row(&self, email: &Email, password: &str)
        -> Result<Identity, StorageError>;
    fn set_auth_password_row(
        &mut self,
        user_id: &UserId,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError>;
    fn delete_auth_user_row(&mut self, actor: &UserId, user_id: &UserId)
        -> Result<(), StorageError>;
    fn auth_user_row(&self, user_id: &UserId) -> Option<Identity>;
    fn auth_user_rows(&self) -> Vec<Identity>;
    fn issue_session_row(
        &mut self,
        user_id: &UserId,
        now: MonotonicTimeNs,
    ) -> Result<Session, StorageError>;
    fn session_row_by_token(&self, access_token: &str) -> Option<Session>;
    fn revoke_session_row(&mut self, access_token: &str) -> bool;
}

/// Typed repository interface for `user_permissions`.
pub trait UserPermissionsRepo {
    fn permission_rows_exist(&self) -> Result<bool, StorageError>;
    fn permission_row_for(
        &self,
        actor: Option<&UserId>,
        subject: &UserId,
    ) -> Result<Option<PermissionMatrix>, StorageError>;
    fn permission_rows_for(&self, actor: &UserId) -> Result<Vec<PermissionMatrix>, StorageError>;
    fn insert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        grants: PermissionGrants,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError>;
    fn upsert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError>;
    fn delete_permission_row(&mut self, actor: &UserId, subject: &UserId)
        -> Result<(), StorageError>;
}

/// Typed repository interface for the content tables (`projects`,
/// `team_members`, `skills`, `admin_settings`, `hero_content`,
/// `portfolio_settings`).
pub trait ContentTablesRepo {
    fn list_content_rows<K: StoredContent>(&self) -> Result<Vec<K::Record>, StorageError>;
    fn insert_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        input: K::Create,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError>;
    fn update_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError>;
    fn delete_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
    ) -> Result<(), StorageError>;
    fn admin_setting_row_by_key(&self, setting_key: &str)
        -> Result<Option<AdminSetting>, StorageError>;
    fn fetch_singleton_row<K: StoredSingleton>(&self) -> Result<Option<K::Record>, StorageError>;
    fn update_singleton<K: StoredSingleton>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError>;
}

/// Typed repository interface for `analytics` and the demo tables.
pub trait AnalyticsTablesRepo {
    fn insert_visit_row(
        &mut self,
        input: VisitInput,
        now: MonotonicTimeNs,
    ) -> Result<VisitRecord, StorageError>;
    fn visit_rows_for(&self, actor: Option<&UserId>) -> Result<Vec<VisitRecord>, StorageError>;
    fn demo_traffic_rows_for(
        &self,
        actor: Option<&UserId>,
    ) -> Result<Vec<DemoTrafficRow>, StorageError>;
    fn demo_project_stat_rows_for(
        &self,
        actor: Option<&UserId>,
    ) -> Result<Vec<DemoProjectStatRow>, StorageError>;
}

impl AuthUsersRepo for PortfolioStore {
    fn create_auth_user_row(
        &mut self,
        email: &Email,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Identity, StorageError> {
        self.create_auth_user(email, password, now)
    }

    fn verify_credentials_row(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Identity, StorageError> {
        self.verify_credentials(email, password)
    }

    fn set_auth_password_row(
        &mut self,
        user_id: &UserId,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError> {
        self.set_auth_password(user_id, password, now)
    }

    fn delete_auth_user_row(
        &mut self,
        actor: &UserId,
        user_id: &UserId,
    ) -> Result<(), StorageError> {
        self.delete_auth_user(actor, user_id)
    }

    fn auth_user_row(&self, user_id: &UserId) -> Option<Identity> {
        self.auth_user(user_id)
    }

    fn auth_user_rows(&self) -> Vec<Identity> {
        self.auth_users()
    }

    fn issue_session_row(
        &mut self,
        user_id: &UserId,
        now: MonotonicTimeNs,
    ) -> Result<Session, StorageError> {
        self.issue_session(user_id, now)
    }

    fn session_row_by_token(&self, access_token: &str) -> Option<Session> {
        self.session_by_token(access_token).cloned()
    }

    fn revoke_session_row(&mut self, access_token: &str) -> bool {
        self.revoke_session(access_token)
    }
}

impl UserPermissionsRepo for PortfolioStore {
    fn permission_rows_exist(&self) -> Result<bool, StorageError> {
        Ok(PortfolioStore::permission_rows_exist(self))
    }

    fn permission_row_for(
        &self,
        actor: Option<&UserId>,
        subject: &UserId,
    ) -> Result<Option<PermissionMatrix>, StorageError> {
        Ok(self.permission_row(actor, subject)?.cloned())
    }

    fn permission_rows_for(&self, actor: &UserId) -> Result<Vec<PermissionMatrix>, StorageError> {
        Ok(self
            .permission_rows(actor)?
            .into_iter()
            .cloned()
            .collect())
    }

    fn insert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        grants: PermissionGrants,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError> {
        PortfolioStore::insert_permission_row(self, actor, subject, grants, now)
    }

    fn upsert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError> {
        PortfolioStore::upsert_permission_row(self, actor, subject, patch, now)
    }

    fn delete_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
    ) -> Result<(), StorageError> {
        PortfolioStore::delete_permission_row(self, actor, subject)
    }
}

impl ContentTablesRepo for PortfolioStore {
    fn list_content_rows<K: StoredContent>(&self) -> Result<Vec<K::Record>, StorageError> {
        Ok(self.content_rows::<K>())
    }

    fn insert_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        input: K::Create,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.insert_content_row::<K>(actor, input, now)
    }

    fn update_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.update_content_row::<K>(actor, id, update, now)
    }

    fn delete_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
    ) -> Result<(), StorageError> {
        self.delete_content_row::<K>(actor, id)
    }

    fn admin_setting_row_by_key(
        &self,
        setting_key: &str,
    ) -> Result<Option<AdminSetting>, StorageError> {
        Ok(self.admin_setting_by_key(setting_key).cloned())
    }

    fn fetch_singleton_row<K: StoredSingleton>(&self) -> Result<Option<K::Record>, StorageError> {
        Ok(self.singleton_row::<K>().cloned())
    }

    fn update_singleton<K: StoredSingleton>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.update_singleton_row::<K>(actor, id, update, now)
    }
}

impl AnalyticsTablesRepo for PortfolioStore {
    fn insert_visit_row(
        &mut self,
        input: VisitInput,
        now: MonotonicTimeNs,
    ) -> Result<VisitRecord, StorageError> {
        self.insert_visit(input, now)
    }

    fn visit_rows_for(&self, actor: Option<&UserId>) -> Result<Vec<VisitRecord>, StorageError> {
        Ok(self.visit_rows(actor)?.to_vec())
    }

    fn demo_traffic_rows_for(
        &self,
        actor: Option<&UserId>,
    ) -> Result<Vec<DemoTrafficRow>, StorageError> {
        Ok(self.demo_traffic_rows(actor)?.to_vec())
    }

    fn demo_project_stat_rows_for(
        &self,
        actor: Option<&UserId>,
    ) -> Result<Vec<DemoProjectStatRow>, StorageError> {
        Ok(self.demo_project_stat_rows(actor)?.to_vec())
    }
}
