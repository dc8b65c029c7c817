#![forbid(unsafe_code)]

//! Per-identity capability matrix over the five content areas.
//!
//! The matrix is keyed by [`ContentArea`]; the flat `{area}_read` /
//! `{area}_write` column layout of the `user_permissions` table only exists at
//! the serialization boundary.

use serde::{Deserialize, Serialize};

use crate::identity::UserId;
use crate::{MonotonicTimeNs, RecordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentArea {
    Analytics,
    Hero,
    Projects,
    Team,
    Settings,
}

impl ContentArea {
    pub const ALL: [ContentArea; 5] = [
        ContentArea::Analytics,
        ContentArea::Hero,
        ContentArea::Projects,
        ContentArea::Team,
        ContentArea::Settings,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ContentArea::Analytics => "analytics",
            ContentArea::Hero => "hero",
            ContentArea::Projects => "projects",
            ContentArea::Team => "team",
            ContentArea::Settings => "settings",
        }
    }

    fn index(self) -> usize {
        match self {
            ContentArea::Analytics => 0,
            ContentArea::Hero => 1,
            ContentArea::Projects => 2,
            ContentArea::Team => 3,
            ContentArea::Settings => 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AreaAccess {
    pub read: bool,
    pub write: bool,
}

impl AreaAccess {
    pub const NONE: AreaAccess = AreaAccess {
        read: false,
        write: false,
    };
    pub const READ_ONLY: AreaAccess = AreaAccess {
        read: true,
        write: false,
    };
    pub const FULL: AreaAccess = AreaAccess {
        read: true,
        write: true,
    };
}

/// What an identity may do inside one area once the override is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessLevel {
    Hidden,
    ReadOnly,
    ReadWrite,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PermissionRowWire", into = "PermissionRowWire")]
pub struct PermissionMatrix {
    pub id: RecordId,
    pub user_id: UserId,
    grants: [AreaAccess; 5],
    pub is_super_admin: bool,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl PermissionMatrix {
    pub fn new(
        id: RecordId,
        user_id: UserId,
        grants: PermissionGrants,
        now: MonotonicTimeNs,
    ) -> Self {
        Self {
            id,
            user_id,
            grants: grants.areas,
            is_super_admin: grants.is_super_admin,
            created_at: now,
            updated_at: now,
        }
    }

    /// Stored flag for `area`, without the super-admin override.
    pub fn stored(&self, area: ContentArea) -> AreaAccess {
        self.grants[area.index()]
    }

    pub fn has_read(&self, area: ContentArea) -> bool {
        self.is_super_admin || self.stored(area).read
    }

    pub fn has_write(&self, area: ContentArea) -> bool {
        self.is_super_admin || self.stored(area).write
    }

    pub fn access_level(&self, area: ContentArea) -> AccessLevel {
        if self.has_read(area) && self.has_write(area) {
            AccessLevel::ReadWrite
        } else if self.has_read(area) {
            AccessLevel::ReadOnly
        } else {
            AccessLevel::Hidden
        }
    }

    pub fn grants(&self) -> PermissionGrants {
        PermissionGrants {
            areas: self.grants,
            is_super_admin: self.is_super_admin,
        }
    }

    pub fn apply_patch(&mut self, patch: &PermissionPatch, now: MonotonicTimeNs) {
        let mut grants = self.grants();
        grants.apply_patch(patch);
        self.grants = grants.areas;
        self.is_super_admin = grants.is_super_admin;
        self.updated_at = now;
    }
}

/// The flag values of a matrix row, independent of row identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionGrants {
    areas: [AreaAccess; 5],
    pub is_super_admin: bool,
}

impl PermissionGrants {
    pub fn none() -> Self {
        Self {
            areas: [AreaAccess::NONE; 5],
            is_super_admin: false,
        }
    }

    /// Row provisioned for the very first identity: every flag set.
    pub fn super_admin() -> Self {
        Self {
            areas: [AreaAccess::FULL; 5],
            is_super_admin: true,
        }
    }

    /// Row provisioned for every later identity.
    pub fn conservative_default() -> Self {
        let mut grants = Self {
            areas: [AreaAccess::READ_ONLY; 5],
            is_super_admin: false,
        };
        grants.set(ContentArea::Settings, AreaAccess::NONE);
        grants
    }

    pub fn get(&self, area: ContentArea) -> AreaAccess {
        self.areas[area.index()]
    }

    pub fn set(&mut self, area: ContentArea, access: AreaAccess) {
        self.areas[area.index()] = access;
    }

    pub fn apply_patch(&mut self, patch: &PermissionPatch) {
        for area in ContentArea::ALL {
            let mut access = self.get(area);
            if let Some(read) = patch.read(area) {
                access.read = read;
            }
            if let Some(write) = patch.write(area) {
                access.write = write;
            }
            self.set(area, access);
        }
        if let Some(is_super_admin) = patch.is_super_admin {
            self.is_super_admin = is_super_admin;
        }
    }

    /// True when every flag here is also set in `other`.
    pub fn is_within(&self, other: &PermissionGrants) -> bool {
        if self.is_super_admin && !other.is_super_admin {
            return false;
        }
        ContentArea::ALL.iter().all(|&area| {
            let mine = self.get(area);
            let theirs = other.get(area);
            (!mine.read || theirs.read) && (!mine.write || theirs.write)
        })
    }
}

/// Partial update of a matrix. `None` leaves the stored flag untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PermissionPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analytics_write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hero_write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projects_write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_read: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings_write: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_super_admin: Option<bool>,
}

impl PermissionPatch {
    pub fn with_area(mut self, area: ContentArea, access: AreaAccess) -> Self {
        *self.read_slot(area) = Some(access.read);
        *self.write_slot(area) = Some(access.write);
        self
    }

    pub fn with_super_admin(mut self, is_super_admin: bool) -> Self {
        self.is_super_admin = Some(is_super_admin);
        self
    }

    pub fn is_empty(&self) -> bool {
        self == &PermissionPatch::default()
    }

    pub fn read(&self, area: ContentArea) -> Option<bool> {
        match area {
            ContentArea::Analytics => self.analytics_read,
            ContentArea::Hero => self.hero_read,
            ContentArea::Projects => self.projects_read,
            ContentArea::Team => self.team_read,
            ContentArea::Settings => self.settings_read,
        }
    }

    pub fn write(&self, area: ContentArea) -> Option<bool> {
        match area {
            ContentArea::Analytics => self.analytics_write,
            ContentArea::Hero => self.hero_write,
            ContentArea::Projects => self.projects_write,
            ContentArea::Team => self.team_write,
            ContentArea::Settings => self.settings_write,
        }
    }

    fn read_slot(&mut self, area: ContentArea) -> &mut Option<bool> {
        match area {
            ContentArea::Analytics => &mut self.analytics_read,
            ContentArea::Hero => &mut self.hero_read,
            ContentArea::Projects => &mut self.projects_read,
            ContentArea::Team => &mut self.team_read,
            ContentArea::Settings => &mut self.settings_read,
        }
    }

    fn write_slot(&mut self, area: ContentArea) -> &mut Option<bool> {
        match area {
            ContentArea::Analytics => &mut self.analytics_write,
            ContentArea::Hero => &mut self.hero_write,
            ContentArea::Projects => &mut self.projects_write,
            ContentArea::Team => &mut self.team_write,
            ContentArea::Settings => &mut self.settings_write,
        }
    }
}

/// Column layout of the `user_permissions` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PermissionRowWire {
    id: RecordId,
    user_id: UserId,
    analytics_read: bool,
    analytics_write: bool,
    hero_read: bool,
    hero_write: bool,
    projects_read: bool,
    projects_write: bool,
    team_read: bool,
    team_write: bool,
    settings_read: bool,
    settings_write: bool,
    is_super_admin: bool,
    created_at: MonotonicTimeNs,
    updated_at: MonotonicTimeNs,
}

impl From<PermissionRowWire> for PermissionMatrix {
    fn from(w: PermissionRowWire) -> Self {
        let access = |read, write| AreaAccess { read, write };
        Self {
            id: w.id,
            user_id: w.user_id,
            grants: [
                access(w.analytics_read, w.analytics_write),
                access(w.hero_read, w.hero_write),
                access(w.projects_read, w.projects_write),
                access(w.team_read, w.team_write),
                access(w.settings_read, w.settings_write),
            ],
            is_super_admin: w.is_super_admin,
            created_at: w.created_at,
            updated_at: w.updated_at,
        }
    }
}

impl From<PermissionMatrix> for PermissionRowWire {
    fn from(m: PermissionMatrix) -> Self {
        let g = |area: ContentArea| m.stored(area);
        Self {
            analytics_read: g(ContentArea::Analytics).read,
            analytics_write: g(ContentArea::Analytics).write,
            hero_read: g(ContentArea::Hero).read,
            hero_write: g(ContentArea::Hero).write,
            projects_read: g(ContentArea::Projects).read,
            projects_write: g(ContentArea::Projects).write,
            team_read: g(ContentArea::Team).read,
            team_write: g(ContentArea::Team).write,
            settings_read: g(ContentArea::Settings).read,
            settings_write: g(ContentArea::Settings).write,
            is_super_admin: m.is_super_admin,
            id: m.id,
            user_id: m.user_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
        }
    }
}
