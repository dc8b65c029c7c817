#![forbid(unsafe_code)]

use std::cell::Cell;

use folio_contracts::analytics::{DemoProjectStatRow, DemoTrafficRow, VisitInput, VisitRecord};
use folio_contracts::content::{AdminSetting, ProjectInput};
use folio_contracts::identity::{Email, Identity, Session, UserId};
use folio_contracts::permissions::{PermissionGrants, PermissionMatrix, PermissionPatch};
use folio_contracts::{MonotonicTimeNs, RecordId};
use folio_storage::repo::{
    AnalyticsTablesRepo, AuthUsersRepo, ContentTablesRepo, UserPermissionsRepo,
};
use folio_storage::store::{PortfolioStore, StorageError, StoredContent, StoredSingleton};

pub const PASSWORD: &str = "password-123";

pub fn project(title: &str) -> ProjectInput {
    ProjectInput {
        title: title.to_string(),
        description: "A project".to_string(),
        year: "2024".to_string(),
        ..ProjectInput::default()
    }
}

pub fn seed_identity(store: &mut PortfolioStore, email: &str) -> UserId {
    store
        .create_auth_user_row(&Email::new(email).unwrap(), PASSWORD, MonotonicTimeNs(1))
        .unwrap()
        .user_id
}

pub fn seed_super_admin(store: &mut PortfolioStore, email: &str) -> UserId {
    let user_id = seed_identity(store, email);
    store
        .insert_permission_row(
            &user_id,
            &user_id,
            PermissionGrants::super_admin(),
            MonotonicTimeNs(1),
        )
        .unwrap();
    user_id
}

/// Store wrapper whose every call fails while `fail` is set. Counts
/// permission-table calls so tests can assert a path never consults them.
pub struct Flaky {
    pub inner: PortfolioStore,
    pub fail: bool,
    pub permission_calls: Cell<u32>,
}

impl Flaky {
    pub fn passing(inner: PortfolioStore) -> Self {
        Self {
            inner,
            fail: false,
            permission_calls: Cell::new(0),
        }
    }

    pub fn failing(inner: PortfolioStore) -> Self {
        Self {
            fail: true,
            ..Self::passing(inner)
        }
    }

    fn check(&self, table: &'static str) -> Result<(), StorageError> {
        if self.fail {
            Err(StorageError::Unavailable {
                table,
                reason: "connection reset".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn count_permission_call(&self) {
        self.permission_calls.set(self.permission_calls.get() + 1);
    }
}

impl UserPermissionsRepo for Flaky {
    fn permission_rows_exist(&self) -> Result<bool, StorageError> {
        self.count_permission_call();
        self.check("user_permissions")?;
        UserPermissionsRepo::permission_rows_exist(&self.inner)
    }

    fn permission_row_for(
        &self,
        actor: Option<&UserId>,
        subject: &UserId,
    ) -> Result<Option<PermissionMatrix>, StorageError> {
        self.count_permission_call();
        self.check("user_permissions")?;
        self.inner.permission_row_for(actor, subject)
    }

    fn permission_rows_for(&self, actor: &UserId) -> Result<Vec<PermissionMatrix>, StorageError> {
        self.count_permission_call();
        self.check("user_permissions")?;
        self.inner.permission_rows_for(actor)
    }

    fn insert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        grants: PermissionGrants,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError> {
        self.count_permission_call();
        self.check("user_permissions")?;
        UserPermissionsRepo::insert_permission_row(&mut self.inner, actor, subject, grants, now)
    }

    fn upsert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError> {
        self.count_permission_call();
        self.check("user_permissions")?;
        UserPermissionsRepo::upsert_permission_row(&mut self.inner, actor, subject, patch, now)
    }

    fn delete_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
    ) -> Result<(), StorageError> {
        self.count_permission_call();
        self.check("user_permissions")?;
        UserPermissionsRepo::delete_permission_row(&mut self.inner, actor, subject)
    }
}

impl ContentTablesRepo for Flaky {
    fn list_content_rows<K: StoredContent>(&self) -> Result<Vec<K::Record>, StorageError> {
        self.check(K::TABLE)?;
        self.inner.list_content_rows::<K>()
    }

    fn insert_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        input: K::Create,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.check(K::TABLE)?;
        self.inner.insert_content::<K>(actor, input, now)
    }

    fn update_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.check(K::TABLE)?;
        self.inner.update_content::<K>(actor, id, update, now)
    }

    fn delete_content<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
    ) -> Result<(), StorageError> {
        self.check(K::TABLE)?;
        self.inner.delete_content::<K>(actor, id)
    }

    fn admin_setting_row_by_key(
        &self,
        setting_key: &str,
    ) -> Result<Option<AdminSetting>, StorageError> {
        self.check("admin_settings")?;
        self.inner.admin_setting_row_by_key(setting_key)
    }

    fn fetch_singleton_row<K: StoredSingleton>(&self) -> Result<Option<K::Record>, StorageError> {
        self.check(K::TABLE)?;
        self.inner.fetch_singleton_row::<K>()
    }

    fn update_singleton<K: StoredSingleton>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.check(K::TABLE)?;
        self.inner.update_singleton::<K>(actor, id, update, now)
    }
}

impl AnalyticsTablesRepo for Flaky {
    fn insert_visit_row(
        &mut self,
        input: VisitInput,
        now: MonotonicTimeNs,
    ) -> Result<VisitRecord, StorageError> {
        self.check("analytics")?;
        self.inner.insert_visit_row(input, now)
    }

    fn visit_rows_for(&self, actor: Option<&UserId>) -> Result<Vec<VisitRecord>, StorageError> {
        self.check("analytics")?;
        self.inner.visit_rows_for(actor)
    }

    fn demo_traffic_rows_for(
        &self,
        actor: Option<&UserId>,
    ) -> Result<Vec<DemoTrafficRow>, StorageError> {
        self.check("dummy_analytics")?;
        self.inner.demo_traffic_rows_for(actor)
    }

    fn demo_project_stat_rows_for(
        &self,
        actor: Option<&UserId>,
    ) -> Result<Vec<DemoProjectStatRow>, StorageError> {
        self.check("dummy_project_stats")?;
        self.inner.demo_project_stat_rows_for(actor)
    }
}

impl AuthUsersRepo for Flaky {
    fn create_auth_user_row(
        &mut self,
        email: &Email,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Identity, StorageError> {
        self.check("auth_users")?;
        self.inner.create_auth_user_row(email, password, now)
    }

    fn verify_credentials_row(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<Identity, StorageError> {
        self.check("auth_users")?;
        self.inner.verify_credentials_row(email, password)
    }

    fn set_auth_password_row(
        &mut self,
        user_id: &UserId,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError> {
        self.check("auth_users")?;
        self.inner.set_auth_password_row(user_id, password, now)
    }

    fn delete_auth_user_row(
        &mut self,
        actor: &UserId,
        user_id: &UserId,
    ) -> Result<(), StorageError> {
        self.check("auth_users")?;
        self.inner.delete_auth_user_row(actor, user_id)
    }

    fn auth_user_row(&self, user_id: &UserId) -> Option<Identity> {
        self.inner.auth_user_row(user_id)
    }

    fn auth_user_rows(&self) -> Vec<Identity> {
        self.inner.auth_user_rows()
    }

    fn issue_session_row(
        &mut self,
        user_id: &UserId,
        now: MonotonicTimeNs,
    ) -> Result<Session, StorageError> {
        self.check("auth_users")?;
        self.inner.issue_session_row(user_id, now)
    }

    fn session_row_by_token(&self, access_token: &str) -> Option<Session> {
        self.inner.session_row_by_token(access_token)
    }

    fn revoke_session_row(&mut self, access_token: &str) -> bool {
        self.inner.revoke_session_row(access_token)
    }
}
