#![forbid(unsafe_code)]

use std::env;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use folio_contracts::analytics::{AnalyticsReport, AnalyticsSource};
use folio_contracts::content::{
    AdminSetting, HeroContent, HeroContentPatch, PortfolioSettings, PortfolioSettingsInput,
    Project, ProjectKind, SkillKind, TeamMemberKind,
};
use folio_contracts::identity::{Email, Identity, UserId};
use folio_contracts::permissions::{PermissionMatrix, PermissionPatch};
use folio_contracts::{ContractViolation, MonotonicTimeNs, RecordId};
use folio_os::admin_shell::{
    open_panel, render_shell, require_write, Panel, PanelView, PermissionDenied, ShellView,
};
use folio_os::analytics::{analytics_report, AnalyticsRecorder};
use folio_os::content::{
    AdminSettingsRepository, ContentRepository, HeroContentRepository,
    PortfolioSettingsRepository, RepositoryError,
};
use folio_os::context::PortalContext;
use folio_os::notify::Notification;
use folio_os::permissions::PermissionError;
use folio_os::public_site::{load_home_page, load_projects, HomePage};
use folio_os::routes::{project_detail, resolve, ProjectDetailView, Route, RouteOutcome};
use folio_os::session::AuthError;
use folio_os::users::{ManagedUser, UserAdminError, UserManager};
use folio_storage::journal::JournalEntry;
use folio_storage::store::{PortfolioStore, StorageError, StoredContent};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_HTTP_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_STORE_PATH: &str = ".folio/adapter_store.jsonl";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Rejected(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Internal(String),
}

impl AdapterError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AdapterError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AdapterError::Forbidden(_) => StatusCode::FORBIDDEN,
            AdapterError::NotFound(_) => StatusCode::NOT_FOUND,
            AdapterError::Rejected(_) => StatusCode::BAD_REQUEST,
            AdapterError::Conflict(_) => StatusCode::CONFLICT,
            AdapterError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn outcome(&self) -> &'static str {
        match self {
            AdapterError::Unauthorized(_) => "UNAUTHORIZED",
            AdapterError::Forbidden(_) => "FORBIDDEN",
            AdapterError::NotFound(_) => "NOT_FOUND",
            AdapterError::Rejected(_) => "REJECTED",
            AdapterError::Conflict(_) => "CONFLICT",
            AdapterError::Internal(_) => "FAILED",
        }
    }

    fn unauthorized(reason: &str) -> Self {
        AdapterError::Unauthorized(reason.to_string())
    }
}

impl From<StorageError> for AdapterError {
    fn from(err: StorageError) -> Self {
        let reason = err.to_string();
        match err {
            StorageError::PolicyViolation { .. } => AdapterError::Forbidden(reason),
            StorageError::NotFound { .. } => AdapterError::NotFound(reason),
            StorageError::DuplicateKey { .. } => AdapterError::Conflict(reason),
            StorageError::InvalidCredentials => AdapterError::Unauthorized(reason),
            StorageError::ContractViolation(_) => AdapterError::Rejected(reason),
            StorageError::Unavailable { .. } | StorageError::Journal(_) => {
                AdapterError::Internal(reason)
            }
        }
    }
}

impl From<ContractViolation> for AdapterError {
    fn from(err: ContractViolation) -> Self {
        AdapterError::Rejected(err.to_string())
    }
}

impl From<AuthError> for AdapterError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::NotSignedIn => {
                AdapterError::Unauthorized(err.to_string())
            }
            AuthError::PasswordMismatch
            | AuthError::PasswordTooShort { .. }
            | AuthError::Contract(_) => AdapterError::Rejected(err.to_string()),
            AuthError::Storage(err) => err.into(),
        }
    }
}

impl From<PermissionError> for AdapterError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::NotSignedIn => AdapterError::Unauthorized(err.to_string()),
            PermissionError::SelfModification
            | PermissionError::NotSuperAdmin
            | PermissionError::Denied { .. } => AdapterError::Forbidden(err.to_string()),
            PermissionError::Storage(err) => err.into(),
        }
    }
}

impl From<RepositoryError> for AdapterError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotLoaded { .. } | RepositoryError::UnknownKey { .. } => {
                AdapterError::NotFound(err.to_string())
            }
            RepositoryError::Storage(err) => err.into(),
        }
    }
}

impl From<UserAdminError> for AdapterError {
    fn from(err: UserAdminError) -> Self {
        match err {
            UserAdminError::MissingFields => AdapterError::Rejected(err.to_string()),
            UserAdminError::Permission(err) => err.into(),
            UserAdminError::Contract(err) => err.into(),
            UserAdminError::Storage(err) => err.into(),
        }
    }
}

impl From<PermissionDenied> for AdapterError {
    fn from(err: PermissionDenied) -> Self {
        AdapterError::Forbidden(err.message)
    }
}

/// Body of every response: `status` is `ok` or `error`, `outcome` names
/// what happened, `reason` explains a rejection.
#[derive(Debug, Clone, Serialize)]
pub struct AdapterResponse<T> {
    pub status: String,
    pub outcome: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notifications: Vec<Notification>,
}

impl<T> AdapterResponse<T> {
    pub fn ok(outcome: &str, data: T) -> Self {
        Self {
            status: "ok".to_string(),
            outcome: outcome.to_string(),
            reason: None,
            data: Some(data),
            notifications: Vec::new(),
        }
    }

    pub fn with_notifications(mut self, notifications: Vec<Notification>) -> Self {
        self.notifications = notifications;
        self
    }
}

impl AdapterResponse<()> {
    pub fn error(err: &AdapterError) -> Self {
        Self {
            status: "error".to_string(),
            outcome: err.outcome().to_string(),
            reason: Some(err.to_string()),
            data: None,
            notifications: Vec::new(),
        }
    }
}

impl IntoResponse for AdapterError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(AdapterResponse::error(&self))).into_response()
    }
}

/// A committed mutation plus the notifications it raised.
#[derive(Debug, Clone)]
pub struct Applied<T> {
    pub data: T,
    pub notifications: Vec<Notification>,
}

impl<T: Serialize> Applied<T> {
    fn into_response_body(self, outcome: &str) -> AdapterResponse<T> {
        AdapterResponse::ok(outcome, self.data).with_notifications(self.notifications)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AdapterHealthResponse {
    pub status: String,
    pub outcome: String,
    pub persistence_enabled: bool,
    pub identities: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInResponse {
    pub access_token: String,
    pub identity: Identity,
    pub is_super_admin: bool,
    pub redirect_to: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VisitRequest {
    pub page_path: String,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SettingValueRequest {
    pub setting_value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteQuery {
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnalyticsQuery {
    #[serde(default)]
    pub source: Option<String>,
}

/// A list-shaped content table managed from an admin panel.
pub trait AdminCollection: StoredContent + Send + Sync + 'static {
    const PANEL: Panel;
}

impl AdminCollection for ProjectKind {
    const PANEL: Panel = Panel::Projects;
}

impl AdminCollection for TeamMemberKind {
    const PANEL: Panel = Panel::Team;
}

impl AdminCollection for SkillKind {
    const PANEL: Panel = Panel::Skills;
}

#[derive(Debug, Clone)]
struct AdapterPersistenceConfig {
    journal_path: PathBuf,
}

/// Shared backend for the HTTP surface. One store lock per request; every
/// committed mutation is appended to the journal before the lock is released.
#[derive(Debug)]
pub struct AdapterRuntime {
    store: Arc<Mutex<PortfolioStore>>,
    persistence: Option<AdapterPersistenceConfig>,
    recorder: AnalyticsRecorder,
}

impl Default for AdapterRuntime {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(PortfolioStore::new_in_memory())))
    }
}

impl AdapterRuntime {
    pub fn new(store: Arc<Mutex<PortfolioStore>>) -> Self {
        Self {
            store,
            persistence: None,
            recorder: AnalyticsRecorder,
        }
    }

    pub fn new_with_persistence(
        store: Arc<Mutex<PortfolioStore>>,
        journal_path: PathBuf,
    ) -> Result<Self, AdapterError> {
        let runtime = Self {
            store,
            persistence: Some(AdapterPersistenceConfig { journal_path }),
            recorder: AnalyticsRecorder,
        };
        runtime.ensure_persistence_ready()?;
        runtime.replay_journal_into_store()?;
        Ok(runtime)
    }

    pub fn default_from_env() -> Result<Self, AdapterError> {
        let store = Arc::new(Mutex::new(PortfolioStore::new_in_memory()));
        let runtime = Self::new_with_persistence(store, parse_store_path_from_env())?;
        runtime.seed_defaults(parse_seed_demo_analytics_from_env())?;
        if let Some((email, password)) = parse_bootstrap_identity_from_env() {
            runtime.bootstrap_identity(&email, &password)?;
        }
        Ok(runtime)
    }

    /// Installs the default site rows, and the demo analytics tables when
    /// asked. Rows already present are left alone.
    pub fn seed_defaults(&self, demo_analytics: bool) -> Result<(), AdapterError> {
        self.with_store(|store| {
            store.seed_site_defaults(now())?;
            if demo_analytics {
                store.seed_demo_analytics()?;
            }
            Ok(())
        })
    }

    /// Creates the first identity when none exist yet. Its first sign-in
    /// makes it super-admin.
    pub fn bootstrap_identity(&self, email: &str, password: &str) -> Result<bool, AdapterError> {
        self.with_store(|store| {
            if !store.auth_users().is_empty() {
                return Ok(false);
            }
            let identity = store.create_auth_user(&Email::new(email)?, password, now())?;
            info!(user_id = %identity.user_id, "bootstrap identity created");
            Ok(true)
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, PortfolioStore>, AdapterError> {
        self.store
            .lock()
            .map_err(|_| AdapterError::Internal("adapter store lock poisoned".to_string()))
    }

    /// Runs `op` under the store lock and persists whatever it committed,
    /// including the commits of a failed call. If the journal append fails
    /// the store is put back to where it was before `op` ran.
    pub fn with_store<T>(
        &self,
        op: impl FnOnce(&mut PortfolioStore) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let mut store = self.lock()?;
        let snapshot = self.persistence.as_ref().map(|_| store.clone());
        let result = op(&mut *store);
        let entries = store.drain_journal();
        if let Err(err) = self.append_journal_entries(&entries) {
            if let Some(snapshot) = snapshot {
                *store = snapshot;
            }
            warn!(entries = entries.len(), error = %err, "journal append failed, mutation rolled back");
            return Err(err);
        }
        result
    }

    /// Same as `with_store` for a caller holding a bearer token.
    fn with_portal<T>(
        &self,
        token: Option<&str>,
        op: impl FnOnce(&mut PortfolioStore, &mut PortalContext) -> Result<T, AdapterError>,
    ) -> Result<T, AdapterError> {
        let token = token.ok_or_else(|| AdapterError::unauthorized("missing bearer token"))?;
        self.with_store(|store| {
            let mut portal = PortalContext::init();
            if portal.restore(&*store, token).is_none() {
                return Err(AdapterError::unauthorized("invalid or expired session"));
            }
            op(store, &mut portal)
        })
    }

    pub fn health_report(&self) -> Result<AdapterHealthResponse, AdapterError> {
        let store = self.lock()?;
        Ok(AdapterHealthResponse {
            status: "ok".to_string(),
            outcome: "HEALTHY".to_string(),
            persistence_enabled: self.persistence.is_some(),
            identities: store.auth_users().len(),
        })
    }

    // ------------------------------------------------------------------
    // public site

    pub fn home_page(&self) -> Result<HomePage, AdapterError> {
        let store = self.lock()?;
        Ok(load_home_page(&*store))
    }

    pub fn projects(&self) -> Result<Vec<Project>, AdapterError> {
        let store = self.lock()?;
        Ok(load_projects(&*store))
    }

    pub fn project_detail(&self, id: &str) -> Result<ProjectDetailView, AdapterError> {
        let store = self.lock()?;
        Ok(project_detail(&*store, id))
    }

    /// Fire-and-forget: nothing here ever reaches the caller.
    pub fn record_visit(&self, page_path: &str, user_agent: Option<&str>) {
        let recorded = self.with_store(|store| {
            self.recorder.record_visit(store, page_path, user_agent, now());
            Ok(())
        });
        if let Err(err) = recorded {
            warn!(page_path, error = %err, "visit not persisted");
        }
    }

    // ------------------------------------------------------------------
    // session

    pub fn sign_in(&self, request: &SignInRequest) -> Result<SignInResponse, AdapterError> {
        self.with_store(|store| {
            let mut portal = PortalContext::init();
            let session = portal.sign_in(store, &request.email, &request.password, now())?;
            let redirect_to = match resolve(Route::Auth, true) {
                RouteOutcome::Redirect { to } => to.to_string(),
                RouteOutcome::Render { route } => route.path(),
            };
            Ok(SignInResponse {
                access_token: session.access_token,
                is_super_admin: portal.permissions.is_super_admin(),
                identity: session.identity,
                redirect_to,
            })
        })
    }

    pub fn sign_out(&self, token: Option<&str>) -> Result<(), AdapterError> {
        self.with_portal(token, |store, portal| {
            portal.sign_out(store, now());
            Ok(())
        })
    }

    pub fn change_password(
        &self,
        token: Option<&str>,
        request: &ChangePasswordRequest,
    ) -> Result<(), AdapterError> {
        self.with_portal(token, |store, portal| {
            portal.session.change_password(
                store,
                &request.current_password,
                &request.new_password,
                &request.confirm_password,
                now(),
            )?;
            Ok(())
        })
    }

    // ------------------------------------------------------------------
    // admin shell + content

    /// Which page `path` renders for this caller, or where it redirects.
    pub fn route(&self, token: Option<&str>, path: &str) -> Result<RouteOutcome, AdapterError> {
        let store = self.lock()?;
        let signed_in = token
            .map(|token| PortalContext::init().restore(&*store, token).is_some())
            .unwrap_or(false);
        Ok(resolve(Route::parse(path), signed_in))
    }

    pub fn shell(&self, token: Option<&str>) -> Result<ShellView, AdapterError> {
        self.with_portal(token, |_, portal| Ok(render_shell(&portal.permissions)))
    }

    pub fn panel(&self, token: Option<&str>, name: &str) -> Result<PanelView, AdapterError> {
        let panel = Panel::parse(name)
            .ok_or_else(|| AdapterError::NotFound(format!("no admin panel '{name}'")))?;
        self.with_portal(token, |_, portal| Ok(open_panel(&portal.permissions, panel)?))
    }

    pub fn list_rows<K: AdminCollection>(
        &self,
        token: Option<&str>,
    ) -> Result<Vec<K::Record>, AdapterError> {
        self.with_portal(token, |store, portal| {
            open_panel(&portal.permissions, K::PANEL)?;
            let mut repo = ContentRepository::<K>::new(actor(portal));
            Ok(repo.list(&*store).to_vec())
        })
    }

    pub fn create_row<K: AdminCollection>(
        &self,
        token: Option<&str>,
        input: K::Create,
    ) -> Result<Applied<K::Record>, AdapterError> {
        self.with_portal(token, |store, portal| {
            require_write(&portal.permissions, K::PANEL)?;
            let mut repo = ContentRepository::<K>::new(actor(portal));
            let row = repo.create(store, input, now())?;
            Ok(Applied {
                data: row,
                notifications: repo.drain_notifications(),
            })
        })
    }

    pub fn update_row<K: AdminCollection>(
        &self,
        token: Option<&str>,
        id: &str,
        update: K::Update,
    ) -> Result<Applied<K::Record>, AdapterError> {
        let id = RecordId::new(id)?;
        self.with_portal(token, |store, portal| {
            require_write(&portal.permissions, K::PANEL)?;
            let mut repo = ContentRepository::<K>::new(actor(portal));
            let row = repo.update(store, &id, update, now())?;
            Ok(Applied {
                data: row,
                notifications: repo.drain_notifications(),
            })
        })
    }

    pub fn delete_row<K: AdminCollection>(
        &self,
        token: Option<&str>,
        id: &str,
    ) -> Result<Applied<RecordId>, AdapterError> {
        let id = RecordId::new(id)?;
        self.with_portal(token, |store, portal| {
            require_write(&portal.permissions, K::PANEL)?;
            let mut repo = ContentRepository::<K>::new(actor(portal));
            repo.delete(store, &id)?;
            Ok(Applied {
                data: id,
                notifications: repo.drain_notifications(),
            })
        })
    }

    pub fn update_hero(
        &self,
        token: Option<&str>,
        patch: HeroContentPatch,
    ) -> Result<Applied<HeroContent>, AdapterError> {
        self.with_portal(token, |store, portal| {
            require_write(&portal.permissions, Panel::Hero)?;
            let mut repo = HeroContentRepository::new(actor(portal));
            repo.fetch(&*store);
            let row = repo.update(store, patch, now())?;
            Ok(Applied {
                data: row,
                notifications: repo.drain_notifications(),
            })
        })
    }

    pub fn update_portfolio_settings(
        &self,
        token: Option<&str>,
        input: PortfolioSettingsInput,
    ) -> Result<Applied<PortfolioSettings>, AdapterError> {
        self.with_portal(token, |store, portal| {
            require_write(&portal.permissions, Panel::Settings)?;
            let mut repo = PortfolioSettingsRepository::new(actor(portal));
            repo.fetch(&*store);
            let row = repo.update(store, input, now())?;
            Ok(Applied {
                data: row,
                notifications: repo.drain_notifications(),
            })
        })
    }

    pub fn admin_settings(&self, token: Option<&str>) -> Result<Vec<AdminSetting>, AdapterError> {
        self.with_portal(token, |store, portal| {
            open_panel(&portal.permissions, Panel::Settings)?;
            let mut repo = AdminSettingsRepository::new(actor(portal));
            Ok(repo.list(&*store).to_vec())
        })
    }

    pub fn update_admin_setting(
        &self,
        token: Option<&str>,
        setting_key: &str,
        setting_value: String,
    ) -> Result<Applied<String>, AdapterError> {
        self.with_portal(token, |store, portal| {
            require_write(&portal.permissions, Panel::Settings)?;
            let mut repo = AdminSettingsRepository::new(actor(portal));
            repo.update_setting(store, setting_key, setting_value, now())?;
            Ok(Applied {
                data: setting_key.to_string(),
                notifications: repo.drain_notifications(),
            })
        })
    }

    pub fn analytics(
        &self,
        token: Option<&str>,
        source: AnalyticsSource,
    ) -> Result<AnalyticsReport, AdapterError> {
        self.with_portal(token, |store, portal| {
            Ok(analytics_report(&*store, &portal.permissions, source)?)
        })
    }

    // ------------------------------------------------------------------
    // user management

    pub fn users(&self, token: Option<&str>) -> Result<Vec<ManagedUser>, AdapterError> {
        self.with_portal(token, |store, portal| {
            let mut manager = UserManager::new();
            Ok(manager.list(&*store, &portal.permissions)?.to_vec())
        })
    }

    pub fn create_user(
        &self,
        token: Option<&str>,
        request: &CreateUserRequest,
    ) -> Result<Applied<Identity>, AdapterError> {
        self.with_portal(token, |store, portal| {
            let mut manager = UserManager::new();
            let identity = manager.create_user(
                store,
                &portal.permissions,
                &request.email,
                &request.password,
                now(),
            )?;
            Ok(Applied {
                data: identity,
                notifications: manager.drain_notifications(),
            })
        })
    }

    pub fn delete_user(
        &self,
        token: Option<&str>,
        user_id: &str,
    ) -> Result<Applied<UserId>, AdapterError> {
        let user_id = UserId::new(user_id)?;
        self.with_portal(token, |store, portal| {
            let mut manager = UserManager::new();
            manager.delete_user(store, &portal.permissions, &user_id)?;
            Ok(Applied {
                data: user_id,
                notifications: manager.drain_notifications(),
            })
        })
    }

    pub fn update_user_permissions(
        &self,
        token: Option<&str>,
        user_id: &str,
        patch: &PermissionPatch,
    ) -> Result<Applied<PermissionMatrix>, AdapterError> {
        let user_id = UserId::new(user_id)?;
        self.with_portal(token, |store, portal| {
            let mut manager = UserManager::new();
            let row = manager.update_permissions(
                store,
                &mut portal.permissions,
                &user_id,
                patch,
                now(),
            )?;
            Ok(Applied {
                data: row,
                notifications: portal.permissions.drain_notifications(),
            })
        })
    }

    // ------------------------------------------------------------------
    // journal

    fn ensure_persistence_ready(&self) -> Result<(), AdapterError> {
        let Some(persistence) = self.persistence.as_ref() else {
            return Ok(());
        };
        let path = &persistence.journal_path;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| {
                AdapterError::Internal(format!(
                    "failed to create adapter store directory '{}': {}",
                    parent.display(),
                    err
                ))
            })?;
        }
        if !path.exists() {
            File::create(path).map_err(|err| {
                AdapterError::Internal(format!(
                    "failed to create adapter store journal '{}': {}",
                    path.display(),
                    err
                ))
            })?;
        }
        Ok(())
    }

    fn replay_journal_into_store(&self) -> Result<(), AdapterError> {
        let Some(persistence) = self.persistence.as_ref() else {
            return Ok(());
        };
        let path = &persistence.journal_path;
        let file = File::open(path).map_err(|err| {
            AdapterError::Internal(format!(
                "failed to open adapter store journal '{}': {}",
                path.display(),
                err
            ))
        })?;
        let mut store = self.lock()?;
        let mut replayed = 0usize;
        for (line_no, line_result) in BufReader::new(file).lines().enumerate() {
            let line = line_result.map_err(|err| {
                AdapterError::Internal(format!(
                    "failed reading adapter store journal '{}' at line {}: {}",
                    path.display(),
                    line_no + 1,
                    err
                ))
            })?;
            if line.trim().is_empty() {
                continue;
            }
            let entry = JournalEntry::from_line(&line).map_err(|err| {
                AdapterError::Internal(format!(
                    "failed parsing adapter store journal '{}' at line {}: {}",
                    path.display(),
                    line_no + 1,
                    err
                ))
            })?;
            store.replay_journal_entry(&entry).map_err(|err| {
                AdapterError::Internal(format!(
                    "journal replay failed at line {} ({} {}): {}",
                    line_no + 1,
                    entry.table(),
                    entry.key(),
                    err
                ))
            })?;
            replayed += 1;
        }
        info!(path = %path.display(), replayed, "adapter store journal replayed");
        Ok(())
    }

    fn append_journal_entries(&self, entries: &[JournalEntry]) -> Result<(), AdapterError> {
        let Some(persistence) = self.persistence.as_ref() else {
            return Ok(());
        };
        if entries.is_empty() {
            return Ok(());
        }
        let path = &persistence.journal_path;
        let mut buf = String::new();
        for entry in entries {
            let line = entry.to_line().map_err(|err| {
                AdapterError::Internal(format!("failed to encode adapter journal entry: {err}"))
            })?;
            buf.push_str(&line);
            buf.push('\n');
        }
        let mut file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(path)
            .map_err(|err| {
                AdapterError::Internal(format!(
                    "failed opening adapter store journal '{}' for append: {}",
                    path.display(),
                    err
                ))
            })?;
        file.write_all(buf.as_bytes())
            .and_then(|_| file.sync_data())
            .map_err(|err| {
                AdapterError::Internal(format!(
                    "failed writing adapter store journal '{}': {}",
                    path.display(),
                    err
                ))
            })?;
        debug!(entries = entries.len(), "adapter journal appended");
        Ok(())
    }
}

fn actor(portal: &PortalContext) -> Option<UserId> {
    portal
        .session
        .current_identity()
        .map(|identity| identity.user_id.clone())
}

// ----------------------------------------------------------------------
// HTTP surface

type SharedRuntime = Arc<AdapterRuntime>;
type AdapterResult<T> = Result<Json<AdapterResponse<T>>, AdapterError>;

pub fn build_router(runtime: SharedRuntime) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/v1/site", get(site))
        .route("/v1/projects", get(public_projects))
        .route("/v1/projects/:id", get(public_project_detail))
        .route("/v1/visits", post(record_visit))
        .route("/v1/auth/sign_in", post(sign_in))
        .route("/v1/auth/sign_out", post(sign_out))
        .route("/v1/route", get(route))
        .route("/v1/admin/shell", get(admin_shell))
        .route("/v1/admin/panels/:panel", get(admin_panel))
        .route(
            "/v1/admin/projects",
            get(list_rows::<ProjectKind>).post(create_row::<ProjectKind>),
        )
        .route(
            "/v1/admin/projects/:id",
            put(update_row::<ProjectKind>).delete(delete_row::<ProjectKind>),
        )
        .route(
            "/v1/admin/team",
            get(list_rows::<TeamMemberKind>).post(create_row::<TeamMemberKind>),
        )
        .route(
            "/v1/admin/team/:id",
            put(update_row::<TeamMemberKind>).delete(delete_row::<TeamMemberKind>),
        )
        .route(
            "/v1/admin/skills",
            get(list_rows::<SkillKind>).post(create_row::<SkillKind>),
        )
        .route(
            "/v1/admin/skills/:id",
            put(update_row::<SkillKind>).delete(delete_row::<SkillKind>),
        )
        .route("/v1/admin/hero", put(update_hero))
        .route("/v1/admin/portfolio_settings", put(update_portfolio_settings))
        .route("/v1/admin/settings", get(admin_settings))
        .route("/v1/admin/settings/:key", put(update_admin_setting))
        .route("/v1/admin/analytics", get(admin_analytics))
        .route("/v1/admin/users", get(list_users).post(create_user))
        .route("/v1/admin/users/:id", delete(delete_user))
        .route("/v1/admin/users/:id/permissions", put(update_user_permissions))
        .route("/v1/admin/password", put(change_password))
        .with_state(runtime)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn healthz(State(runtime): State<SharedRuntime>) -> Response {
    match runtime.health_report() {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn site(State(runtime): State<SharedRuntime>) -> AdapterResult<HomePage> {
    Ok(Json(AdapterResponse::ok("RENDERED", runtime.home_page()?)))
}

async fn public_projects(State(runtime): State<SharedRuntime>) -> AdapterResult<Vec<Project>> {
    Ok(Json(AdapterResponse::ok("RENDERED", runtime.projects()?)))
}

async fn public_project_detail(
    State(runtime): State<SharedRuntime>,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<AdapterResponse<ProjectDetailView>>), AdapterError> {
    let view = runtime.project_detail(&id)?;
    Ok(match view {
        ProjectDetailView::Found { .. } => {
            (StatusCode::OK, Json(AdapterResponse::ok("RENDERED", view)))
        }
        ProjectDetailView::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            Json(AdapterResponse::ok("NOT_FOUND", view)),
        ),
    })
}

async fn record_visit(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(request): Json<VisitRequest>,
) -> (StatusCode, Json<AdapterResponse<()>>) {
    let header_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());
    let user_agent = request.user_agent.as_deref().or(header_agent);
    runtime.record_visit(&request.page_path, user_agent);
    (StatusCode::ACCEPTED, Json(AdapterResponse::ok("ACCEPTED", ())))
}

async fn sign_in(
    State(runtime): State<SharedRuntime>,
    Json(request): Json<SignInRequest>,
) -> AdapterResult<SignInResponse> {
    Ok(Json(AdapterResponse::ok("SIGNED_IN", runtime.sign_in(&request)?)))
}

async fn sign_out(State(runtime): State<SharedRuntime>, headers: HeaderMap) -> AdapterResult<()> {
    runtime.sign_out(bearer_token(&headers))?;
    Ok(Json(AdapterResponse::ok("SIGNED_OUT", ())))
}

async fn change_password(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(request): Json<ChangePasswordRequest>,
) -> AdapterResult<()> {
    runtime.change_password(bearer_token(&headers), &request)?;
    Ok(Json(AdapterResponse::ok("APPLIED", ())))
}

async fn route(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Query(query): Query<RouteQuery>,
) -> AdapterResult<RouteOutcome> {
    Ok(Json(AdapterResponse::ok(
        "RESOLVED",
        runtime.route(bearer_token(&headers), &query.path)?,
    )))
}

async fn admin_panel(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(panel): Path<String>,
) -> AdapterResult<PanelView> {
    Ok(Json(AdapterResponse::ok(
        "RENDERED",
        runtime.panel(bearer_token(&headers), &panel)?,
    )))
}

async fn admin_shell(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
) -> AdapterResult<ShellView> {
    Ok(Json(AdapterResponse::ok(
        "RENDERED",
        runtime.shell(bearer_token(&headers))?,
    )))
}

async fn list_rows<K>(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
) -> AdapterResult<Vec<K::Record>>
where
    K: AdminCollection,
{
    Ok(Json(AdapterResponse::ok(
        "RENDERED",
        runtime.list_rows::<K>(bearer_token(&headers))?,
    )))
}

async fn create_row<K>(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(input): Json<K::Create>,
) -> AdapterResult<K::Record>
where
    K: AdminCollection,
    K::Create: Send + 'static,
{
    let applied = runtime.create_row::<K>(bearer_token(&headers), input)?;
    Ok(Json(applied.into_response_body("CREATED")))
}

async fn update_row<K>(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(update): Json<K::Update>,
) -> AdapterResult<K::Record>
where
    K: AdminCollection,
    K::Update: Send + 'static,
{
    let applied = runtime.update_row::<K>(bearer_token(&headers), &id, update)?;
    Ok(Json(applied.into_response_body("UPDATED")))
}

async fn delete_row<K>(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AdapterResult<RecordId>
where
    K: AdminCollection,
{
    let applied = runtime.delete_row::<K>(bearer_token(&headers), &id)?;
    Ok(Json(applied.into_response_body("DELETED")))
}

async fn update_hero(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(patch): Json<HeroContentPatch>,
) -> AdapterResult<HeroContent> {
    let applied = runtime.update_hero(bearer_token(&headers), patch)?;
    Ok(Json(applied.into_response_body("UPDATED")))
}

async fn update_portfolio_settings(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(input): Json<PortfolioSettingsInput>,
) -> AdapterResult<PortfolioSettings> {
    let applied = runtime.update_portfolio_settings(bearer_token(&headers), input)?;
    Ok(Json(applied.into_response_body("UPDATED")))
}

async fn admin_settings(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
) -> AdapterResult<Vec<AdminSetting>> {
    Ok(Json(AdapterResponse::ok(
        "RENDERED",
        runtime.admin_settings(bearer_token(&headers))?,
    )))
}

async fn update_admin_setting(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(request): Json<SettingValueRequest>,
) -> AdapterResult<String> {
    let applied =
        runtime.update_admin_setting(bearer_token(&headers), &key, request.setting_value)?;
    Ok(Json(applied.into_response_body("UPDATED")))
}

async fn admin_analytics(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Query(query): Query<AnalyticsQuery>,
) -> AdapterResult<AnalyticsReport> {
    let source = match query.source.as_deref() {
        None => AnalyticsSource::default(),
        Some(raw) => AnalyticsSource::parse(raw)
            .ok_or_else(|| AdapterError::Rejected(format!("unknown analytics source '{raw}'")))?,
    };
    Ok(Json(AdapterResponse::ok(
        "RENDERED",
        runtime.analytics(bearer_token(&headers), source)?,
    )))
}

async fn list_users(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
) -> AdapterResult<Vec<ManagedUser>> {
    Ok(Json(AdapterResponse::ok(
        "RENDERED",
        runtime.users(bearer_token(&headers))?,
    )))
}

async fn create_user(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Json(request): Json<CreateUserRequest>,
) -> AdapterResult<Identity> {
    let applied = runtime.create_user(bearer_token(&headers), &request)?;
    Ok(Json(applied.into_response_body("CREATED")))
}

async fn delete_user(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AdapterResult<UserId> {
    let applied = runtime.delete_user(bearer_token(&headers), &id)?;
    Ok(Json(applied.into_response_body("DELETED")))
}

async fn update_user_permissions(
    State(runtime): State<SharedRuntime>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(patch): Json<PermissionPatch>,
) -> AdapterResult<PermissionMatrix> {
    let applied = runtime.update_user_permissions(bearer_token(&headers), &id, &patch)?;
    Ok(Json(applied.into_response_body("UPDATED")))
}

// ----------------------------------------------------------------------
// configuration

pub fn parse_http_bind_from_env() -> String {
    env::var("FOLIO_HTTP_BIND")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string())
}

pub fn parse_store_path_from_env() -> PathBuf {
    env::var("FOLIO_ADAPTER_STORE_PATH")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH))
}

pub fn parse_seed_demo_analytics_from_env() -> bool {
    match env::var("FOLIO_SEED_DEMO_ANALYTICS") {
        Ok(v) => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "off" | "no"
        ),
        Err(_) => true,
    }
}

/// Both `FOLIO_BOOTSTRAP_EMAIL` and `FOLIO_BOOTSTRAP_PASSWORD` must be set.
pub fn parse_bootstrap_identity_from_env() -> Option<(String, String)> {
    let email = env::var("FOLIO_BOOTSTRAP_EMAIL").ok()?;
    let password = env::var("FOLIO_BOOTSTRAP_PASSWORD").ok()?;
    let email = email.trim().to_string();
    if email.is_empty() || password.is_empty() {
        return None;
    }
    Some((email, password))
}

pub fn system_time_now_ns() -> u64 {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(1);
    if nanos > u64::MAX as u128 {
        u64::MAX
    } else {
        nanos as u64
    }
}

fn now() -> MonotonicTimeNs {
    MonotonicTimeNs(system_time_now_ns())
}
