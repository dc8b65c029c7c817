#![forbid(unsafe_code)]

use std::marker::PhantomData;

use folio_contracts::content::{
    AdminSettingKind, AdminSettingPatch, ContentKind, ContentRow, HeroContentKind, InsertPlacement,
    PortfolioSettingsKind, ProjectKind, SkillKind, TeamMemberKind,
};
use folio_contracts::identity::UserId;
use folio_contracts::{MonotonicTimeNs, RecordId};
use folio_storage::repo::ContentTablesRepo;
use folio_storage::store::{StorageError, StoredContent, StoredSingleton};
use tracing::{debug, warn};

use crate::notify::{Notification, Notifier};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{label} is not loaded yet")]
    NotLoaded { label: &'static str },
    #[error("no {label} with key {key}")]
    UnknownKey { label: &'static str, key: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Identifies one fetch. Results carrying a ticket from an older epoch, or
/// older than the last applied fetch, are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    epoch: u64,
    seq: u64,
}

#[derive(Debug, Default)]
struct FetchGate {
    epoch: u64,
    next_seq: u64,
    applied_seq: Option<u64>,
}

impl FetchGate {
    fn issue(&mut self) -> FetchTicket {
        let ticket = FetchTicket {
            epoch: self.epoch,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        ticket
    }

    fn accept(&mut self, ticket: FetchTicket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        if self.applied_seq.is_some_and(|seq| ticket.seq < seq) {
            return false;
        }
        self.applied_seq = Some(ticket.seq);
        true
    }

    fn advance_epoch(&mut self) {
        self.epoch += 1;
        self.applied_seq = None;
    }
}

fn lower(label: &str) -> String {
    label.to_ascii_lowercase()
}

/// Cached view of one list-shaped table. Mutations go to the backend first
/// and touch the cache only once the backend confirmed them.
#[derive(Debug)]
pub struct ContentRepository<K: StoredContent> {
    actor: Option<UserId>,
    items: Vec<K::Record>,
    loading: bool,
    gate: FetchGate,
    notices: Notifier,
    _kind: PhantomData<K>,
}

pub type ProjectRepository = ContentRepository<ProjectKind>;
pub type TeamMemberRepository = ContentRepository<TeamMemberKind>;
pub type SkillRepository = ContentRepository<SkillKind>;
pub type AdminSettingsRepository = ContentRepository<AdminSettingKind>;

impl<K: StoredContent> ContentRepository<K> {
    /// `actor` is the signed-in identity mutations are attributed to; `None`
    /// for anonymous readers.
    pub fn new(actor: Option<UserId>) -> Self {
        Self {
            actor,
            items: Vec::new(),
            loading: true,
            gate: FetchGate::default(),
            notices: Notifier::default(),
            _kind: PhantomData,
        }
    }

    pub fn items(&self) -> &[K::Record] {
        &self.items
    }

    pub fn get(&self, id: &RecordId) -> Option<&K::Record> {
        self.items.iter().find(|r| r.id() == id)
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.gate.issue()
    }

    /// Applies a fetch result unless it went stale. Returns whether it was
    /// applied.
    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Vec<K::Record>, StorageError>,
    ) -> bool {
        if !self.gate.accept(ticket) {
            debug!(table = K::TABLE, "discarding stale fetch result");
            return false;
        }
        match result {
            Ok(rows) => self.items = rows,
            Err(err) => {
                warn!(table = K::TABLE, error = %err, "content fetch failed");
                self.notices
                    .error(format!("Failed to fetch {}", K::TABLE.replace('_', " ")));
            }
        }
        self.loading = false;
        true
    }

    pub fn list<B: ContentTablesRepo>(&mut self, backend: &B) -> &[K::Record] {
        let ticket = self.begin_fetch();
        let result = backend.list_content_rows::<K>();
        self.complete_fetch(ticket, result);
        &self.items
    }

    pub fn refetch<B: ContentTablesRepo>(&mut self, backend: &B) -> &[K::Record] {
        self.list(backend)
    }

    /// Drops the cache. Fetches still in flight will be discarded.
    pub fn teardown(&mut self) {
        self.gate.advance_epoch();
        self.items.clear();
        self.loading = true;
    }

    pub fn create<B: ContentTablesRepo>(
        &mut self,
        backend: &mut B,
        input: K::Create,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, RepositoryError> {
        match backend.insert_content::<K>(self.actor.as_ref(), input, now) {
            Ok(row) => {
                match K::PLACEMENT {
                    InsertPlacement::Prepend => self.items.insert(0, row.clone()),
                    InsertPlacement::Append => self.items.push(row.clone()),
                }
                self.notices
                    .success(format!("{} created successfully", K::LABEL));
                Ok(row)
            }
            Err(err) => Err(self.fail("create", err)),
        }
    }

    pub fn update<B: ContentTablesRepo>(
        &mut self,
        backend: &mut B,
        id: &RecordId,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, RepositoryError> {
        match backend.update_content::<K>(self.actor.as_ref(), id, update, now) {
            Ok(row) => {
                if let Some(slot) = self.items.iter_mut().find(|r| r.id() == id) {
                    *slot = row.clone();
                }
                self.notices
                    .success(format!("{} updated successfully", K::LABEL));
                Ok(row)
            }
            Err(err) => Err(self.fail("update", err)),
        }
    }

    pub fn delete<B: ContentTablesRepo>(
        &mut self,
        backend: &mut B,
        id: &RecordId,
    ) -> Result<(), RepositoryError> {
        match backend.delete_content::<K>(self.actor.as_ref(), id) {
            Ok(()) => {
                self.items.retain(|r| r.id() != id);
                self.notices
                    .success(format!("{} deleted successfully", K::LABEL));
                Ok(())
            }
            Err(err) => Err(self.fail("delete", err)),
        }
    }

    fn fail(&mut self, op: &'static str, err: StorageError) -> RepositoryError {
        warn!(table = K::TABLE, op, error = %err, "content mutation failed");
        self.notices
            .error(format!("Failed to {op} {}", lower(K::LABEL)));
        RepositoryError::Storage(err)
    }

    pub fn notifications(&self) -> &[Notification] {
        self.notices.pending()
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notices.drain()
    }
}

impl ContentRepository<AdminSettingKind> {
    /// Sets the value of the setting named `setting_key`.
    pub fn update_setting<B: ContentTablesRepo>(
        &mut self,
        backend: &mut B,
        setting_key: &str,
        setting_value: impl Into<String>,
        now: MonotonicTimeNs,
    ) -> Result<(), RepositoryError> {
        let cached = self
            .items
            .iter()
            .find(|s| s.setting_key == setting_key)
            .map(|s| s.id.clone());
        let id = match cached {
            Some(id) => id,
            None => match backend.admin_setting_row_by_key(setting_key) {
                Ok(Some(row)) => row.id,
                Ok(None) => {
                    self.notices.error("Failed to update setting");
                    return Err(RepositoryError::UnknownKey {
                        label: AdminSettingKind::LABEL,
                        key: setting_key.to_string(),
                    });
                }
                Err(err) => return Err(self.fail("update", err)),
            },
        };
        let patch = AdminSettingPatch {
            setting_value: Some(setting_value.into()),
            description: None,
        };
        self.update(backend, &id, patch, now).map(|_| ())
    }
}

/// Cached view of a single-row table.
#[derive(Debug)]
pub struct SingletonRepository<K: StoredSingleton> {
    actor: Option<UserId>,
    row: Option<K::Record>,
    loading: bool,
    gate: FetchGate,
    notices: Notifier,
    _kind: PhantomData<K>,
}

pub type HeroContentRepository = SingletonRepository<HeroContentKind>;
pub type PortfolioSettingsRepository = SingletonRepository<PortfolioSettingsKind>;

impl<K: StoredSingleton> SingletonRepository<K> {
    pub fn new(actor: Option<UserId>) -> Self {
        Self {
            actor,
            row: None,
            loading: true,
            gate: FetchGate::default(),
            notices: Notifier::default(),
            _kind: PhantomData,
        }
    }

    pub fn row(&self) -> Option<&K::Record> {
        self.row.as_ref()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.gate.issue()
    }

    pub fn complete_fetch(
        &mut self,
        ticket: FetchTicket,
        result: Result<Option<K::Record>, StorageError>,
    ) -> bool {
        if !self.gate.accept(ticket) {
            debug!(table = K::TABLE, "discarding stale fetch result");
            return false;
        }
        match result {
            Ok(row) => self.row = row,
            Err(err) => {
                warn!(table = K::TABLE, error = %err, "singleton fetch failed");
                self.notices
                    .error(format!("Failed to fetch {}", lower(K::LABEL)));
            }
        }
        self.loading = false;
        true
    }

    pub fn fetch<B: ContentTablesRepo>(&mut self, backend: &B) -> Option<&K::Record> {
        let ticket = self.begin_fetch();
        let result = backend.fetch_singleton_row::<K>();
        self.complete_fetch(ticket, result);
        self.row.as_ref()
    }

    pub fn teardown(&mut self) {
        self.gate.advance_epoch();
        self.row = None;
        self.loading = true;
    }

    /// Rejected when no row has been loaded yet.
    pub fn update<B: ContentTablesRepo>(
        &mut self,
        backend: &mut B,
        update: K::Update,
        now: MonotonicTimeNs,
    ) -> Result<K::Record, RepositoryError> {
        let Some(id) = self.row.as_ref().map(|r| r.id().clone()) else {
            self.notices
                .error(format!("{} is not loaded", K::LABEL));
            return Err(RepositoryError::NotLoaded { label: K::LABEL });
        };
        match backend.update_singleton::<K>(self.actor.as_ref(), &id, update, now) {
            Ok(row) => {
                self.row = Some(row.clone());
                self.notices
                    .success(format!("{} updated successfully", K::LABEL));
                Ok(row)
            }
            Err(err) => {
                warn!(table = K::TABLE, error = %err, "singleton update failed");
                self.notices
                    .error(format!("Failed to update {}", lower(K::LABEL)));
                Err(RepositoryError::Storage(err))
            }
        }
    }

    pub fn drain_notifications(&mut self) -> Vec<Notification> {
        self.notices.drain()
    }
}
