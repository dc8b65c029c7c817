#![forbid(unsafe_code)]

use folio_contracts::analytics::PROJECT_PATH_PREFIX;
use folio_contracts::content::Project;
use folio_storage::repo::ContentTablesRepo;
use serde::Serialize;

use crate::public_site::find_project;

pub const PATH_HOME: &str = "/";
pub const PATH_PROJECTS: &str = "/projects";
pub const PATH_AUTH: &str = "/auth";
pub const PATH_ADMIN: &str = "/admin";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Route {
    Home,
    Projects,
    ProjectDetail { id: String },
    Auth,
    Admin,
    NotFound { path: String },
}

impl Route {
    pub fn parse(path: &str) -> Route {
        let trimmed = path
            .split(&['?', '#'][..])
            .next()
            .unwrap_or_default();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => PATH_HOME,
            other => other,
        };
        match normalized {
            PATH_HOME => Route::Home,
            PATH_PROJECTS => Route::Projects,
            PATH_AUTH => Route::Auth,
            PATH_ADMIN => Route::Admin,
            other => match other.strip_prefix(PROJECT_PATH_PREFIX) {
                Some(id) if !id.is_empty() && !id.contains('/') => Route::ProjectDetail {
                    id: id.to_string(),
                },
                _ => Route::NotFound {
                    path: path.to_string(),
                },
            },
        }
    }

    pub fn path(&self) -> String {
        match self {
            Route::Home => PATH_HOME.to_string(),
            Route::Projects => PATH_PROJECTS.to_string(),
            Route::ProjectDetail { id } => format!("{PROJECT_PATH_PREFIX}{id}"),
            Route::Auth => PATH_AUTH.to_string(),
            Route::Admin => PATH_ADMIN.to_string(),
            Route::NotFound { path } => path.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RouteOutcome {
    Render { route: Route },
    Redirect { to: &'static str },
}

/// Admin needs a session; a signed-in visit to the auth page goes straight
/// to the admin shell.
pub fn resolve(route: Route, signed_in: bool) -> RouteOutcome {
    match route {
        Route::Admin if !signed_in => RouteOutcome::Redirect { to: PATH_AUTH },
        Route::Auth if signed_in => RouteOutcome::Redirect { to: PATH_ADMIN },
        route => RouteOutcome::Render { route },
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum ProjectDetailView {
    Found { project: Box<Project> },
    NotFound {
        title: &'static str,
        back_link: &'static str,
        back_label: &'static str,
    },
}

impl ProjectDetailView {
    pub fn not_found() -> Self {
        ProjectDetailView::NotFound {
            title: "Project Not Found",
            back_link: PATH_PROJECTS,
            back_label: "Back to Projects",
        }
    }
}

pub fn project_detail<B: ContentTablesRepo>(backend: &B, id: &str) -> ProjectDetailView {
    match find_project(backend, id) {
        Some(project) => ProjectDetailView::Found {
            project: Box::new(project),
        },
        None => ProjectDetailView::not_found(),
    }
}
