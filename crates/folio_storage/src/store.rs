#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use folio_contracts::analytics::{DemoProjectStatRow, DemoTrafficRow, VisitInput, VisitRecord};
use folio_contracts::content::{
    AdminSetting, AdminSettingKind, ContentKind, ContentRow, HeroContent, HeroContentKind,
    PortfolioSettings, PortfolioSettingsInput, PortfolioSettingsKind, Project, ProjectKind,
    SingletonKind, Skill, SkillKind, TeamMember, TeamMemberKind,
};
use folio_contracts::identity::{Email, Identity, Session, UserId};
use folio_contracts::permissions::{
    ContentArea, PermissionGrants, PermissionMatrix, PermissionPatch,
};
use folio_contracts::{ContractViolation, MonotonicTimeNs, RecordId, Validate};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::auth::{new_access_token, AuthUserRecord};
use crate::journal::JournalEntry;

pub const TABLE_AUTH_USERS: &str = "auth_users";
pub const TABLE_USER_PERMISSIONS: &str = "user_permissions";
pub const TABLE_ANALYTICS: &str = "analytics";
pub const TABLE_DUMMY_ANALYTICS: &str = "dummy_analytics";
pub const TABLE_DUMMY_PROJECT_STATS: &str = "dummy_project_stats";

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StorageError {
    #[error("row-level policy on {table} rejected the request: {reason}")]
    PolicyViolation {
        table: &'static str,
        reason: &'static str,
    },
    #[error("{table} has no row {key}")]
    NotFound { table: &'static str, key: String },
    #[error("{table} already has a row {key}")]
    DuplicateKey { table: &'static str, key: String },
    #[error("invalid login credentials")]
    InvalidCredentials,
    #[error("{table} is unavailable: {reason}")]
    Unavailable { table: &'static str, reason: String },
    #[error("journal error: {0}")]
    Journal(String),
    #[error(transparent)]
    ContractViolation(#[from] ContractViolation),
}

/// List-shaped content table backed by the store.
pub trait StoredContent: ContentKind {
    fn rows(store: &PortfolioStore) -> &BTreeMap<RecordId, Self::Record>;
    fn rows_mut(store: &mut PortfolioStore) -> &mut BTreeMap<RecordId, Self::Record>;

    /// Unique column of the table as `(index name, value)`, if it has one.
    fn unique_key(_row: &Self::Record) -> Option<(&'static str, &str)> {
        None
    }
}

/// Single-row content table backed by the store.
pub trait StoredSingleton: SingletonKind {
    fn row(store: &PortfolioStore) -> Option<&Self::Record>;
    fn row_mut(store: &mut PortfolioStore) -> &mut Option<Self::Record>;
}

/// In-memory rendition of the hosted backend: every table the site reads or
/// writes, with the row-level policies applied on each call.
#[derive(Debug, Clone, Default)]
pub struct PortfolioStore {
    auth_users: BTreeMap<UserId, AuthUserRecord>,
    auth_users_by_email: BTreeMap<Email, UserId>,
    // Sessions are not journaled; a restart signs everybody out.
    sessions: BTreeMap<String, Session>,

    user_permissions: BTreeMap<UserId, PermissionMatrix>,

    projects: BTreeMap<RecordId, Project>,
    team_members: BTreeMap<RecordId, TeamMember>,
    skills: BTreeMap<RecordId, Skill>,
    admin_settings: BTreeMap<RecordId, AdminSetting>,
    hero_content: Option<HeroContent>,
    portfolio_settings: Option<PortfolioSettings>,

    analytics: Vec<VisitRecord>,
    dummy_analytics: Vec<DemoTrafficRow>,
    dummy_project_stats: Vec<DemoProjectStatRow>,

    journal: Vec<JournalEntry>,
}

impl StoredContent for ProjectKind {
    fn rows(store: &PortfolioStore) -> &BTreeMap<RecordId, Project> {
        &store.projects
    }

    fn rows_mut(store: &mut PortfolioStore) -> &mut BTreeMap<RecordId, Project> {
        &mut store.projects
    }
}

impl StoredContent for TeamMemberKind {
    fn rows(store: &PortfolioStore) -> &BTreeMap<RecordId, TeamMember> {
        &store.team_members
    }

    fn rows_mut(store: &mut PortfolioStore) -> &mut BTreeMap<RecordId, TeamMember> {
        &mut store.team_members
    }
}

impl StoredContent for SkillKind {
    fn rows(store: &PortfolioStore) -> &BTreeMap<RecordId, Skill> {
        &store.skills
    }

    fn rows_mut(store: &mut PortfolioStore) -> &mut BTreeMap<RecordId, Skill> {
        &mut store.skills
    }
}

impl StoredContent for AdminSettingKind {
    fn rows(store: &PortfolioStore) -> &BTreeMap<RecordId, AdminSetting> {
        &store.admin_settings
    }

    fn rows_mut(store: &mut PortfolioStore) -> &mut BTreeMap<RecordId, AdminSetting> {
        &mut store.admin_settings
    }

    fn unique_key(row: &AdminSetting) -> Option<(&'static str, &str)> {
        Some(("admin_settings.setting_key", row.setting_key.as_str()))
    }
}

impl StoredSingleton for HeroContentKind {
    fn row(store: &PortfolioStore) -> Option<&HeroContent> {
        store.hero_content.as_ref()
    }

    fn row_mut(store: &mut PortfolioStore) -> &mut Option<HeroContent> {
        &mut store.hero_content
    }
}

impl StoredSingleton for PortfolioSettingsKind {
    fn row(store: &PortfolioStore) -> Option<&PortfolioSettings> {
        store.portfolio_settings.as_ref()
    }

    fn row_mut(store: &mut PortfolioStore) -> &mut Option<PortfolioSettings> {
        &mut store.portfolio_settings
    }
}

fn new_record_id() -> Result<RecordId, StorageError> {
    Ok(RecordId::new(Uuid::new_v4().to_string())?)
}

impl PortfolioStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // journal

    fn record_upsert<T: Serialize>(
        &mut self,
        table: &'static str,
        key: &str,
        row: &T,
    ) -> Result<(), StorageError> {
        let row = serde_json::to_value(row).map_err(|e| StorageError::Journal(e.to_string()))?;
        self.journal.push(JournalEntry::Upsert {
            table: table.to_string(),
            key: key.to_string(),
            row,
        });
        Ok(())
    }

    fn record_delete(&mut self, table: &'static str, key: &str) {
        self.journal.push(JournalEntry::Delete {
            table: table.to_string(),
            key: key.to_string(),
        });
    }

    /// Mutations committed since the previous drain, oldest first.
    pub fn drain_journal(&mut self) -> Vec<JournalEntry> {
        std::mem::take(&mut self.journal)
    }

    /// Re-applies a journaled mutation without policy checks and without
    /// journaling it again.
    pub fn replay_journal_entry(&mut self, entry: &JournalEntry) -> Result<(), StorageError> {
        match entry {
            JournalEntry::Upsert { table, row, .. } => match table.as_str() {
                TABLE_AUTH_USERS => {
                    let rec: AuthUserRecord = decode_row(row)?;
                    self.auth_users_by_email
                        .insert(rec.email.clone(), rec.user_id.clone());
                    self.auth_users.insert(rec.user_id.clone(), rec);
                }
                TABLE_USER_PERMISSIONS => {
                    let rec: PermissionMatrix = decode_row(row)?;
                    self.user_permissions.insert(rec.user_id.clone(), rec);
                }
                TABLE_ANALYTICS => self.analytics.push(decode_row(row)?),
                TABLE_DUMMY_ANALYTICS => self.dummy_analytics.push(decode_row(row)?),
                TABLE_DUMMY_PROJECT_STATS => self.dummy_project_stats.push(decode_row(row)?),
                t if t == ProjectKind::TABLE => self.replay_content_upsert::<ProjectKind>(row)?,
                t if t == TeamMemberKind::TABLE => {
                    self.replay_content_upsert::<TeamMemberKind>(row)?
                }
                t if t == SkillKind::TABLE => self.replay_content_upsert::<SkillKind>(row)?,
                t if t == AdminSettingKind::TABLE => {
                    self.replay_content_upsert::<AdminSettingKind>(row)?
                }
                t if t == HeroContentKind::TABLE => self.hero_content = Some(decode_row(row)?),
                t if t == PortfolioSettingsKind::TABLE => {
                    self.portfolio_settings = Some(decode_row(row)?)
                }
                other => {
                    return Err(StorageError::Journal(format!("unknown table {other}")));
                }
            },
            JournalEntry::Delete { table, key } => match table.as_str() {
                TABLE_AUTH_USERS => {
                    let user_id = UserId::new(key.as_str())?;
                    if let Some(rec) = self.auth_users.remove(&user_id) {
                        self.auth_users_by_email.remove(&rec.email);
                    }
                }
                TABLE_USER_PERMISSIONS => {
                    self.user_permissions.remove(&UserId::new(key.as_str())?);
                }
                t if t == ProjectKind::TABLE => self.replay_content_delete::<ProjectKind>(key)?,
                t if t == TeamMemberKind::TABLE => {
                    self.replay_content_delete::<TeamMemberKind>(key)?
                }
                t if t == SkillKind::TABLE => self.replay_content_delete::<SkillKind>(key)?,
                t if t == AdminSettingKind::TABLE => {
                    self.replay_content_delete::<AdminSettingKind>(key)?
                }
                other => {
                    return Err(StorageError::Journal(format!(
                        "delete not supported on {other}"
                    )));
                }
            },
        }
        Ok(())
    }

    fn replay_content_upsert<K: StoredContent>(
        &mut self,
        row: &serde_json::Value,
    ) -> Result<(), StorageError> {
        let rec: K::Record = decode_row(row)?;
        K::rows_mut(self).insert(rec.id().clone(), rec);
        Ok(())
    }

    fn replay_content_delete<K: StoredContent>(&mut self, key: &str) -> Result<(), StorageError> {
        K::rows_mut(self).remove(&RecordId::new(key)?);
        Ok(())
    }

    // ------------------------------------------------------------------
    // policy helpers

    fn matrix_of(&self, actor: Option<&UserId>) -> Option<&PermissionMatrix> {
        actor.and_then(|a| self.user_permissions.get(a))
    }

    fn is_super_admin(&self, actor: &UserId) -> bool {
        self.user_permissions
            .get(actor)
            .map(|m| m.is_super_admin)
            .unwrap_or(false)
    }

    fn require_write(
        &self,
        table: &'static str,
        area: ContentArea,
        actor: Option<&UserId>,
    ) -> Result<(), StorageError> {
        match self.matrix_of(actor) {
            Some(m) if m.has_write(area) => Ok(()),
            _ => Err(StorageError::PolicyViolation {
                table,
                reason: "write permission required for this area",
            }),
        }
    }

    fn require_read(
        &self,
        table: &'static str,
        area: ContentArea,
        actor: Option<&UserId>,
    ) -> Result<(), StorageError> {
        match self.matrix_of(actor) {
            Some(m) if m.has_read(area) => Ok(()),
            _ => Err(StorageError::PolicyViolation {
                table,
                reason: "read permission required for this area",
            }),
        }
    }

    /// Mutations of another identity's row: super-admin only, never on self.
    fn require_admin_over(
        &self,
        table: &'static str,
        actor: &UserId,
        subject: &UserId,
    ) -> Result<(), StorageError> {
        if actor == subject {
            return Err(StorageError::PolicyViolation {
                table,
                reason: "an identity cannot modify its own permissions",
            });
        }
        if !self.is_super_admin(actor) {
            return Err(StorageError::PolicyViolation {
                table,
                reason: "super-admin required",
            });
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // auth_users + sessions

    pub fn create_auth_user(
        &mut self,
        email: &Email,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<Identity, StorageError> {
        if password.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "auth_users.password",
                reason: "must not be empty",
            }
            .into());
        }
        if self.auth_users_by_email.contains_key(email) {
            return Err(StorageError::DuplicateKey {
                table: "auth_users.email",
                key: email.as_str().to_string(),
            });
        }
        let user_id = UserId::new(Uuid::new_v4().to_string())?;
        let rec = AuthUserRecord::v1(user_id.clone(), email.clone(), password, now);
        self.record_upsert(TABLE_AUTH_USERS, user_id.as_str(), &rec)?;
        let identity = rec.identity();
        self.auth_users_by_email.insert(email.clone(), user_id.clone());
        self.auth_users.insert(user_id, rec);
        debug!(user_id = %identity.user_id, "auth user created");
        Ok(identity)
    }

    pub fn verify_credentials(&self, email: &Email, password: &str) -> Result<Identity, StorageError> {
        self.auth_users_by_email
            .get(email)
            .and_then(|id| self.auth_users.get(id))
            .filter(|rec| rec.verify_password(password))
            .map(AuthUserRecord::identity)
            .ok_or(StorageError::InvalidCredentials)
    }

    pub fn set_auth_password(
        &mut self,
        user_id: &UserId,
        password: &str,
        now: MonotonicTimeNs,
    ) -> Result<(), StorageError> {
        let rec = self
            .auth_users
            .get_mut(user_id)
            .ok_or_else(|| StorageError::NotFound {
                table: TABLE_AUTH_USERS,
                key: user_id.as_str().to_string(),
            })?;
        rec.set_password(password, now);
        let snapshot = rec.clone();
        self.record_upsert(TABLE_AUTH_USERS, user_id.as_str(), &snapshot)
    }

    /// Removes an identity, its sessions, and its permission row.
    pub fn delete_auth_user(
        &mut self,
        actor: &UserId,
        user_id: &UserId,
    ) -> Result<(), StorageError> {
        self.require_admin_over(TABLE_AUTH_USERS, actor, user_id)?;
        let rec = self
            .auth_users
            .remove(user_id)
            .ok_or_else(|| StorageError::NotFound {
                table: TABLE_AUTH_USERS,
                key: user_id.as_str().to_string(),
            })?;
        self.auth_users_by_email.remove(&rec.email);
        self.sessions.retain(|_, s| s.user_id() != user_id);
        if self.user_permissions.remove(user_id).is_some() {
            self.record_delete(TABLE_USER_PERMISSIONS, user_id.as_str());
        }
        self.record_delete(TABLE_AUTH_USERS, user_id.as_str());
        Ok(())
    }

    pub fn auth_user(&self, user_id: &UserId) -> Option<Identity> {
        self.auth_users.get(user_id).map(AuthUserRecord::identity)
    }

    pub fn auth_users(&self) -> Vec<Identity> {
        let mut out: Vec<Identity> = self
            .auth_users
            .values()
            .map(AuthUserRecord::identity)
            .collect();
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.email.cmp(&b.email))
        });
        out
    }

    pub fn issue_session(
        &mut self,
        user_id: &UserId,
        now: MonotonicTimeNs,
    ) -> Result<Session, StorageError> {
        let identity = self.auth_user(user_id).ok_or_else(|| StorageError::NotFound {
            table: TABLE_AUTH_USERS,
            key: user_id.as_str().to_string(),
        })?;
        let session = Session {
            identity,
            access_token: new_access_token(),
            issued_at: now,
        };
        self.sessions
            .insert(session.access_token.clone(), session.clone());
        Ok(session)
    }

    pub fn session_by_token(&self, access_token: &str) -> Option<&Session> {
        self.sessions.get(access_token)
    }

    pub fn revoke_session(&mut self, access_token: &str) -> bool {
        self.sessions.remove(access_token).is_some()
    }

    // ------------------------------------------------------------------
    // user_permissions

    /// True when at least one permission row exists. Bypasses row visibility
    /// so first-user provisioning can see the whole table.
    pub fn permission_rows_exist(&self) -> bool {
        !self.user_permissions.is_empty()
    }

    pub fn permission_row(
        &self,
        actor: Option<&UserId>,
        subject: &UserId,
    ) -> Result<Option<&PermissionMatrix>, StorageError> {
        let visible = match actor {
            Some(a) => a == subject || self.is_super_admin(a),
            None => false,
        };
        if !visible {
            return Err(StorageError::PolicyViolation {
                table: TABLE_USER_PERMISSIONS,
                reason: "rows are visible to their subject or a super-admin",
            });
        }
        Ok(self.user_permissions.get(subject))
    }

    pub fn permission_rows(&self, actor: &UserId) -> Result<Vec<&PermissionMatrix>, StorageError> {
        if !self.is_super_admin(actor) {
            return Err(StorageError::PolicyViolation {
                table: TABLE_USER_PERMISSIONS,
                reason: "super-admin required",
            });
        }
        Ok(self.user_permissions.values().collect())
    }

    /// Creates the row for `subject`.
    ///
    /// An identity may insert its own row only when the grants stay within
    /// the conservative default, or as super-admin while the table is empty.
    /// A super-admin may insert rows for anyone else.
    pub fn insert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        grants: PermissionGrants,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError> {
        if self.user_permissions.contains_key(subject) {
            return Err(StorageError::DuplicateKey {
                table: TABLE_USER_PERMISSIONS,
                key: subject.as_str().to_string(),
            });
        }
        let allowed = if actor == subject {
            grants.is_within(&PermissionGrants::conservative_default())
                || (self.user_permissions.is_empty() && grants == PermissionGrants::super_admin())
        } else {
            self.is_super_admin(actor)
        };
        if !allowed {
            return Err(StorageError::PolicyViolation {
                table: TABLE_USER_PERMISSIONS,
                reason: "insert exceeds what this identity may grant",
            });
        }
        let row = PermissionMatrix::new(new_record_id()?, subject.clone(), grants, now);
        self.record_upsert(TABLE_USER_PERMISSIONS, subject.as_str(), &row)?;
        self.user_permissions.insert(subject.clone(), row.clone());
        Ok(row)
    }

    /// Applies `patch` to the row of `subject`, creating it from all-false
    /// flags when absent.
    pub fn upsert_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
        patch: &PermissionPatch,
        now: MonotonicTimeNs,
    ) -> Result<PermissionMatrix, StorageError> {
        self.require_admin_over(TABLE_USER_PERMISSIONS, actor, subject)?;
        let row = match self.user_permissions.get(subject) {
            Some(existing) => {
                let mut row = existing.clone();
                row.apply_patch(patch, now);
                row
            }
            None => {
                let mut grants = PermissionGrants::none();
                grants.apply_patch(patch);
                PermissionMatrix::new(new_record_id()?, subject.clone(), grants, now)
            }
        };
        self.record_upsert(TABLE_USER_PERMISSIONS, subject.as_str(), &row)?;
        self.user_permissions.insert(subject.clone(), row.clone());
        Ok(row)
    }

    pub fn delete_permission_row(
        &mut self,
        actor: &UserId,
        subject: &UserId,
    ) -> Result<(), StorageError> {
        self.require_admin_over(TABLE_USER_PERMISSIONS, actor, subject)?;
        if self.user_permissions.remove(subject).is_none() {
            return Err(StorageError::NotFound {
                table: TABLE_USER_PERMISSIONS,
                key: subject.as_str().to_string(),
            });
        }
        self.record_delete(TABLE_USER_PERMISSIONS, subject.as_str());
        Ok(())
    }

    // ------------------------------------------------------------------
    // content tables

    pub fn content_rows<K: StoredContent>(&self) -> Vec<K::Record> {
        let mut rows: Vec<K::Record> = K::rows(self).values().cloned().collect();
        K::sort(&mut rows);
        rows
    }

    pub fn content_row<K: StoredContent>(&self, id: &RecordId) -> Option<&K::Record> {
        K::rows(self).get(id)
    }

    pub fn insert_content_row<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        input: K::Create,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.require_write(K::TABLE, K::AREA, actor)?;
        input.validate()?;
        let row = K::build(new_record_id()?, input, now);
        if let Some((index, key)) = K::unique_key(&row) {
            let taken = K::rows(self)
                .values()
                .any(|other| K::unique_key(other).map(|(_, k)| k) == Some(key));
            if taken {
                return Err(StorageError::DuplicateKey {
                    table: index,
                    key: key.to_string(),
                });
            }
        }
        self.record_upsert(K::TABLE, row.id().as_str(), &row)?;
        K::rows_mut(self).insert(row.id().clone(), row.clone());
        Ok(row)
    }

    pub fn update_content_row<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.require_write(K::TABLE, K::AREA, actor)?;
        update.validate()?;
        let mut row = K::rows(self)
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                table: K::TABLE,
                key: id.as_str().to_string(),
            })?;
        K::apply_update(&mut row, update, now);
        self.record_upsert(K::TABLE, id.as_str(), &row)?;
        K::rows_mut(self).insert(id.clone(), row.clone());
        Ok(row)
    }

    pub fn delete_content_row<K: StoredContent>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
    ) -> Result<(), StorageError> {
        self.require_write(K::TABLE, K::AREA, actor)?;
        if K::rows_mut(self).remove(id).is_none() {
            return Err(StorageError::NotFound {
                table: K::TABLE,
                key: id.as_str().to_string(),
            });
        }
        self.record_delete(K::TABLE, id.as_str());
        Ok(())
    }

    pub fn admin_setting_by_key(&self, setting_key: &str) -> Option<&AdminSetting> {
        self.admin_settings
            .values()
            .find(|s| s.setting_key == setting_key)
    }

    pub fn singleton_row<K: StoredSingleton>(&self) -> Option<&K::Record> {
        K::row(self)
    }

    pub fn update_singleton_row<K: StoredSingleton>(
        &mut self,
        actor: Option<&UserId>,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, StorageError> {
        self.require_write(K::TABLE, K::AREA, actor)?;
        update.validate()?;
        let mut row = K::row(self)
            .filter(|r| r.id() == id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                table: K::TABLE,
                key: id.as_str().to_string(),
            })?;
        K::apply_update(&mut row, update, now);
        self.record_upsert(K::TABLE, id.as_str(), &row)?;
        *K::row_mut(self) = Some(row.clone());
        Ok(row)
    }

    /// Installs the default hero and portfolio settings rows when missing.
    pub fn seed_site_defaults(&mut self, now: MonotonicTimeNs) -> Result<(), StorageError> {
        if self.hero_content.is_none() {
            let hero = HeroContent {
                id: new_record_id()?,
                main_heading: "Full Stack Developer".to_string(),
                subtitle: "Building reliable products end to end".to_string(),
                description: "Passionate about creating innovative solutions and bringing ideas \
                              to life through code."
                    .to_string(),
                github_url: None,
                linkedin_url: None,
                email_url: None,
                created_at: now,
                updated_at: now,
            };
            self.record_upsert(HeroContentKind::TABLE, hero.id.as_str(), &hero)?;
            self.hero_content = Some(hero);
        }
        if self.portfolio_settings.is_none() {
            let settings = PortfolioSettings {
                id: new_record_id()?,
                fields: PortfolioSettingsInput {
                    portfolio_title: "Portfolio".to_string(),
                    contact_email: "hello@example.com".to_string(),
                    phone: "+1 (555) 123-4567".to_string(),
                },
                created_at: now,
                updated_at: now,
            };
            self.record_upsert(PortfolioSettingsKind::TABLE, settings.id.as_str(), &settings)?;
            self.portfolio_settings = Some(settings);
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // analytics + demo tables

    /// Open to anonymous callers.
    pub fn insert_visit(
        &mut self,
        input: VisitInput,
        now: MonotonicTimeNs,
    ) -> Result<VisitRecord, StorageError> {
        input.validate()?;
        let row = VisitRecord {
            id: new_record_id()?,
            page_path: input.page_path,
            user_agent: input.user_agent,
            visitor_ip: input.visitor_ip,
            created_at: now,
        };
        self.record_upsert(TABLE_ANALYTICS, row.id.as_str(), &row)?;
        self.analytics.push(row.clone());
        Ok(row)
    }

    pub fn visit_rows(&self, actor: Option<&UserId>) -> Result<&[VisitRecord], StorageError> {
        self.require_read(TABLE_ANALYTICS, ContentArea::Analytics, actor)?;
        Ok(&self.analytics)
    }

    pub fn demo_traffic_rows(
        &self,
        actor: Option<&UserId>,
    ) -> Result<&[DemoTrafficRow], StorageError> {
        self.require_read(TABLE_DUMMY_ANALYTICS, ContentArea::Analytics, actor)?;
        Ok(&self.dummy_analytics)
    }

    pub fn demo_project_stat_rows(
        &self,
        actor: Option<&UserId>,
    ) -> Result<&[DemoProjectStatRow], StorageError> {
        self.require_read(TABLE_DUMMY_PROJECT_STATS, ContentArea::Analytics, actor)?;
        Ok(&self.dummy_project_stats)
    }

    /// Fills the demo tables with a week of sample traffic when they are empty.
    pub fn seed_demo_analytics(&mut self) -> Result<(), StorageError> {
        if self.dummy_analytics.is_empty() {
            let week = [
                ("Mon", 120, 340),
                ("Tue", 150, 410),
                ("Wed", 170, 460),
                ("Thu", 140, 390),
                ("Fri", 190, 520),
                ("Sat", 90, 230),
                ("Sun", 80, 210),
            ];
            for (date, visitors, views) in week {
                let row = DemoTrafficRow {
                    id: new_record_id()?,
                    date: date.to_string(),
                    visitors,
                    views,
                };
                self.record_upsert(TABLE_DUMMY_ANALYTICS, row.id.as_str(), &row)?;
                self.dummy_analytics.push(row);
            }
        }
        if self.dummy_project_stats.is_empty() {
            let stats = [
                ("E-commerce Platform", 820, 140, "United States"),
                ("Task Manager", 610, 95, "Germany"),
                ("Weather Dashboard", 430, 60, "India"),
                ("Portfolio Site", 300, 45, "Brazil"),
            ];
            for (project_name, views, clicks, location) in stats {
                let row = DemoProjectStatRow {
                    id: new_record_id()?,
                    project_name: project_name.to_string(),
                    views,
                    clicks,
                    location: location.to_string(),
                };
                self.record_upsert(TABLE_DUMMY_PROJECT_STATS, row.id.as_str(), &row)?;
                self.dummy_project_stats.push(row);
            }
        }
        Ok(())
    }
}

fn decode_row<T: DeserializeOwned>(row: &serde_json::Value) -> Result<T, StorageError> {
    serde_json::from_value(row.clone()).map_err(|e| StorageError::Journal(e.to_string()))
}
