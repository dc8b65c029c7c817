#![forbid(unsafe_code)]

use folio_contracts::permissions::ContentArea;
use serde::Serialize;

pub use folio_contracts::permissions::AccessLevel as PanelState;

use crate::permissions::PermissionStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Panel {
    Analytics,
    Hero,
    Projects,
    Skills,
    Team,
    Settings,
    Users,
}

impl Panel {
    pub const ALL: [Panel; 7] = [
        Panel::Analytics,
        Panel::Hero,
        Panel::Projects,
        Panel::Skills,
        Panel::Team,
        Panel::Settings,
        Panel::Users,
    ];

    /// Area gating this panel. `Users` is gated on super-admin instead.
    pub fn area(self) -> Option<ContentArea> {
        match self {
            Panel::Analytics => Some(ContentArea::Analytics),
            Panel::Hero => Some(ContentArea::Hero),
            Panel::Projects | Panel::Skills => Some(ContentArea::Projects),
            Panel::Team => Some(ContentArea::Team),
            Panel::Settings => Some(ContentArea::Settings),
            Panel::Users => None,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Panel::Analytics => "Analytics",
            Panel::Hero => "Hero Section",
            Panel::Projects => "Project Management",
            Panel::Skills => "Skills",
            Panel::Team => "Team Management",
            Panel::Settings => "Settings",
            Panel::Users => "User Management",
        }
    }

    pub fn parse(s: &str) -> Option<Panel> {
        Panel::ALL
            .into_iter()
            .find(|p| serde_name(*p) == s.trim().to_ascii_lowercase())
    }
}

fn serde_name(panel: Panel) -> &'static str {
    match panel {
        Panel::Analytics => "analytics",
        Panel::Hero => "hero",
        Panel::Projects => "projects",
        Panel::Skills => "skills",
        Panel::Team => "team",
        Panel::Settings => "settings",
        Panel::Users => "users",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PanelControls {
    pub can_create: bool,
    pub can_update: bool,
    pub can_delete: bool,
}

impl PanelControls {
    fn for_state(state: PanelState) -> Self {
        let enabled = state == PanelState::ReadWrite;
        Self {
            can_create: enabled,
            can_update: enabled,
            can_delete: enabled,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PanelView {
    pub panel: Panel,
    pub title: &'static str,
    pub state: PanelState,
    pub controls: PanelControls,
}

/// Placeholder rendered in place of a panel the identity may not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct PermissionDenied {
    pub panel: Panel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellView {
    pub is_super_admin: bool,
    /// Visible panels only; hidden ones are absent.
    pub panels: Vec<PanelView>,
}

pub fn panel_state(perms: &PermissionStore, panel: Panel) -> PanelState {
    match panel.area() {
        Some(area) => perms.access_level(area),
        None if perms.is_super_admin() => PanelState::ReadWrite,
        None => PanelState::Hidden,
    }
}

pub fn render_shell(perms: &PermissionStore) -> ShellView {
    let panels = Panel::ALL
        .into_iter()
        .filter_map(|panel| {
            let state = panel_state(perms, panel);
            (state != PanelState::Hidden).then(|| PanelView {
                panel,
                title: panel.title(),
                state,
                controls: PanelControls::for_state(state),
            })
        })
        .collect();
    ShellView {
        is_super_admin: perms.is_super_admin(),
        panels,
    }
}

pub fn open_panel(perms: &PermissionStore, panel: Panel) -> Result<PanelView, PermissionDenied> {
    let state = panel_state(perms, panel);
    if state == PanelState::Hidden {
        return Err(PermissionDenied {
            panel,
            message: format!(
                "You don't have permission to access {}.",
                panel.title().to_ascii_lowercase()
            ),
        });
    }
    Ok(PanelView {
        panel,
        title: panel.title(),
        state,
        controls: PanelControls::for_state(state),
    })
}

/// Mutation guard for a panel's controls.
pub fn require_write(perms: &PermissionStore, panel: Panel) -> Result<(), PermissionDenied> {
    let view = open_panel(perms, panel)?;
    if view.state != PanelState::ReadWrite {
        return Err(PermissionDenied {
            panel,
            message: format!(
                "You don't have permission to edit {}.",
                panel.title().to_ascii_lowercase()
            ),
        });
    }
    Ok(())
}
