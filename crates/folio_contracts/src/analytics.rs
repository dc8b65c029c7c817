#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::{validate_optional_text, validate_text};
use crate::{ContractViolation, MonotonicTimeNs, RecordId, Validate};

pub const WEEKDAY_LABELS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Path prefix of the project detail route; visits under it count toward
/// per-project stats.
pub const PROJECT_PATH_PREFIX: &str = "/project/";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitInput {
    pub page_path: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub visitor_ip: Option<String>,
}

impl VisitInput {
    pub fn v1(page_path: impl Into<String>, user_agent: Option<String>) -> Self {
        Self {
            page_path: page_path.into(),
            user_agent,
            visitor_ip: None,
        }
    }
}

impl Validate for VisitInput {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("visit.page_path", &self.page_path, 2048)?;
        if !self.page_path.starts_with('/') {
            return Err(ContractViolation::InvalidValue {
                field: "visit.page_path",
                reason: "must start with '/'",
            });
        }
        validate_optional_text("visit.user_agent", self.user_agent.as_deref(), 1024)?;
        validate_optional_text("visit.visitor_ip", self.visitor_ip.as_deref(), 64)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitRecord {
    pub id: RecordId,
    pub page_path: String,
    pub user_agent: Option<String>,
    pub visitor_ip: Option<String>,
    pub created_at: MonotonicTimeNs,
}

pub fn project_id_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(PROJECT_PATH_PREFIX)?;
    let id = rest.split(&['/', '?', '#'][..]).next().unwrap_or("");
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsSource {
    #[default]
    Live,
    Demo,
}

impl AnalyticsSource {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Some(Self::Live),
            "demo" => Some(Self::Demo),
            _ => None,
        }
    }
}

/// Row of `dummy_analytics`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoTrafficRow {
    pub id: RecordId,
    pub date: String,
    pub visitors: u64,
    pub views: u64,
}

/// Row of `dummy_project_stats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoProjectStatRow {
    pub id: RecordId,
    pub project_name: String,
    pub views: u64,
    pub clicks: u64,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTraffic {
    pub label: String,
    pub visitors: u64,
    pub views: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStat {
    pub project_name: String,
    pub views: u64,
    pub clicks: u64,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsReport {
    pub source: AnalyticsSource,
    pub traffic: Vec<DailyTraffic>,
    pub project_stats: Vec<ProjectStat>,
    pub total_visitors: u64,
    pub total_views: u64,
    pub total_clicks: u64,
}
