#![forbid(unsafe_code)]

use std::collections::{BTreeMap, BTreeSet};

use folio_contracts::analytics::{
    project_id_from_path, AnalyticsReport, AnalyticsSource, DailyTraffic, ProjectStat,
    VisitInput, VisitRecord, WEEKDAY_LABELS,
};
use folio_contracts::content::ProjectKind;
use folio_contracts::permissions::ContentArea;
use folio_contracts::MonotonicTimeNs;
use folio_storage::repo::{AnalyticsTablesRepo, ContentTablesRepo};
use tracing::{debug, warn};

use crate::permissions::{PermissionError, PermissionStore};

/// Logs one visit per route change. Never fails the caller.
#[derive(Debug, Default, Clone)]
pub struct AnalyticsRecorder;

impl AnalyticsRecorder {
    pub fn record_visit<B: AnalyticsTablesRepo>(
        &self,
        backend: &mut B,
        page_path: &str,
        user_agent: Option<&str>,
        now: MonotonicTimeNs,
    ) {
        let input = VisitInput::v1(page_path, user_agent.map(str::to_string));
        match backend.insert_visit_row(input, now) {
            Ok(_) => debug!(page_path, "visit recorded"),
            Err(err) => warn!(page_path, error = %err, "visit not recorded"),
        }
    }
}

/// Builds the dashboard report. Requires analytics read.
pub fn analytics_report<B: AnalyticsTablesRepo + ContentTablesRepo>(
    backend: &B,
    perms: &PermissionStore,
    source: AnalyticsSource,
) -> Result<AnalyticsReport, PermissionError> {
    perms.require_read(ContentArea::Analytics)?;
    let actor = perms.identity();
    match source {
        AnalyticsSource::Live => {
            let visits = backend.visit_rows_for(actor)?;
            // Project titles are cosmetic; fall back to ids when unavailable.
            let titles: BTreeMap<String, String> = backend
                .list_content_rows::<ProjectKind>()
                .unwrap_or_default()
                .into_iter()
                .map(|p| (p.id.as_str().to_string(), p.fields.title))
                .collect();
            Ok(live_report(&visits, &titles))
        }
        AnalyticsSource::Demo => {
            let traffic: Vec<DailyTraffic> = backend
                .demo_traffic_rows_for(actor)?
                .into_iter()
                .map(|r| DailyTraffic {
                    label: r.date,
                    visitors: r.visitors,
                    views: r.views,
                })
                .collect();
            let project_stats: Vec<ProjectStat> = backend
                .demo_project_stat_rows_for(actor)?
                .into_iter()
                .map(|r| ProjectStat {
                    project_name: r.project_name,
                    views: r.views,
                    clicks: r.clicks,
                    location: Some(r.location),
                })
                .collect();
            Ok(finish_report(AnalyticsSource::Demo, traffic, project_stats))
        }
    }
}

/// Weekday series (visitors = distinct user agents, views = visits) and
/// per-project detail-page views.
pub fn live_report(visits: &[VisitRecord], titles: &BTreeMap<String, String>) -> AnalyticsReport {
    let mut agents: [BTreeSet<&str>; 7] = Default::default();
    let mut views = [0u64; 7];
    let mut per_project: BTreeMap<&str, u64> = BTreeMap::new();

    for visit in visits {
        let day = visit.created_at.weekday_index();
        views[day] += 1;
        agents[day].insert(visit.user_agent.as_deref().unwrap_or(""));
        if let Some(id) = project_id_from_path(&visit.page_path) {
            *per_project.entry(id).or_default() += 1;
        }
    }

    let traffic = WEEKDAY_LABELS
        .iter()
        .enumerate()
        .map(|(i, label)| DailyTraffic {
            label: label.to_string(),
            visitors: agents[i].len() as u64,
            views: views[i],
        })
        .collect();

    let mut project_stats: Vec<ProjectStat> = per_project
        .into_iter()
        .map(|(id, count)| ProjectStat {
            project_name: titles.get(id).cloned().unwrap_or_else(|| id.to_string()),
            views: count,
            clicks: 0,
            location: None,
        })
        .collect();
    project_stats.sort_by(|a, b| {
        b.views
            .cmp(&a.views)
            .then_with(|| a.project_name.cmp(&b.project_name))
    });

    finish_report(AnalyticsSource::Live, traffic, project_stats)
}

fn finish_report(
    source: AnalyticsSource,
    traffic: Vec<DailyTraffic>,
    project_stats: Vec<ProjectStat>,
) -> AnalyticsReport {
    AnalyticsReport {
        source,
        total_visitors: traffic.iter().map(|d| d.visitors).sum(),
        total_views: traffic.iter().map(|d| d.views).sum(),
        total_clicks: project_stats.iter().map(|p| p.clicks).sum(),
        traffic,
        project_stats,
    }
}
