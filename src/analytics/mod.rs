// SPDX-License-Identifier: MIT
//! Derived views over a user's records: profile stats and the yearly
//! dashboard. Pure assembly over data the caller already fetched.

use chrono::{Datelike, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::aggregation::{
    collaboration_level, competency_index, count_by_category, count_by_year, filter_by_facets,
    Facets,
};
use crate::progression::Progress;
use crate::records::ActivityRecord;

/// Dashboard shows at most this many recent records.
const DASHBOARD_RECENT_LIMIT: usize = 5;

#[derive(Debug, Clone, Serialize)]
pub struct LevelInfo {
    pub level: i64,
    pub exp: i64,
    pub max_exp: i64,
    /// round(exp / max_exp * 100)
    pub progress_percentage: i64,
    pub rank: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserStats {
    pub total_records: u64,
    pub category_counts: HashMap<String, u64>,
    pub year_counts: HashMap<String, u64>,
    pub last_record_date: Option<String>,
    pub records_this_month: u64,
    pub level_info: LevelInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub year: String,
    pub total_projects: u64,
    pub competency_index: f64,
    pub collaboration_level: u64,
    pub recent_records: Vec<ActivityRecord>,
}

fn rank_label(progress_percentage: i64) -> &'static str {
    if progress_percentage >= 95 {
        "top 5%"
    } else if progress_percentage >= 90 {
        "top 10%"
    } else {
        "growing"
    }
}

pub fn level_info(progress: Progress) -> LevelInfo {
    let progress_percentage = if progress.max_exp > 0 {
        ((progress.exp as f64 / progress.max_exp as f64) * 100.0).round() as i64
    } else {
        0
    };
    LevelInfo {
        level: progress.level,
        exp: progress.exp,
        max_exp: progress.max_exp,
        progress_percentage,
        rank: rank_label(progress_percentage),
    }
}

/// Month a record counts toward. Dateless records count toward no month.
fn record_month(record: &ActivityRecord) -> Option<&str> {
    record.date.as_deref().map(|d| d.get(..7).unwrap_or(d))
}

pub fn user_stats(progress: Progress, records: &[ActivityRecord]) -> UserStats {
    let current_month = format!("{:04}-{:02}", Utc::now().year(), Utc::now().month());
    let records_this_month = records
        .iter()
        .filter(|r| record_month(r) == Some(current_month.as_str()))
        .count() as u64;

    let last_record_date = records
        .iter()
        .filter_map(|r| r.date.as_deref())
        .max()
        .map(String::from);

    UserStats {
        total_records: records.len() as u64,
        category_counts: count_by_category(records),
        year_counts: count_by_year(records),
        last_record_date,
        records_this_month,
        level_info: level_info(progress),
    }
}

/// Build the dashboard. Competency and collaboration are signals over the
/// user's entire history, and `total_projects` counts every PROJECT
/// record; only the recent list is scoped to the requested year.
/// `records` must be in recency order; the recent list keeps that order.
pub fn dashboard(records: &[ActivityRecord], year: Option<String>) -> Dashboard {
    let year = year.unwrap_or_else(|| Utc::now().year().to_string());

    let total = records.len() as u64;
    let projects = records
        .iter()
        .filter(|r| r.category == "PROJECT")
        .count() as u64;

    let facets = Facets {
        year: Some(year.clone()),
        ..Facets::default()
    };
    let mut recent = filter_by_facets(records, &facets);
    recent.truncate(DASHBOARD_RECENT_LIMIT);

    Dashboard {
        competency_index: competency_index(total),
        collaboration_level: collaboration_level(total),
        total_projects: projects,
        recent_records: recent,
        year,
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, category: &str, year: &str, date: Option<&str>) -> ActivityRecord {
        ActivityRecord {
            id: id.to_string(),
            user_id: "u1".to_string(),
            title: format!("record {id}"),
            category: category.to_string(),
            date: date.map(String::from),
            description: None,
            content: None,
            tags: vec![],
            year: year.to_string(),
            status: "done".to_string(),
            created_at: "2026-08-01T00:00:00Z".to_string(),
            updated_at: "2026-08-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn rank_thresholds() {
        assert_eq!(rank_label(95), "top 5%");
        assert_eq!(rank_label(94), "top 10%");
        assert_eq!(rank_label(90), "top 10%");
        assert_eq!(rank_label(89), "growing");
    }

    #[test]
    fn progress_percentage_rounds() {
        let info = level_info(Progress {
            level: 2,
            exp: 667,
            max_exp: 1000,
        });
        assert_eq!(info.progress_percentage, 67);
        assert_eq!(info.rank, "growing");
    }

    #[test]
    fn stats_over_empty_records() {
        let stats = user_stats(
            Progress {
                level: 1,
                exp: 0,
                max_exp: 1000,
            },
            &[],
        );
        assert_eq!(stats.total_records, 0);
        assert!(stats.category_counts.is_empty());
        assert_eq!(stats.last_record_date, None);
        assert_eq!(stats.records_this_month, 0);
    }

    #[test]
    fn last_record_date_is_max_of_dated_records() {
        let records = vec![
            rec("a", "PROJECT", "2026", Some("2026-03-10")),
            rec("b", "CLASS", "2026", None),
            rec("c", "PROJECT", "2026", Some("2026-07-02")),
        ];
        let stats = user_stats(
            Progress {
                level: 1,
                exp: 0,
                max_exp: 1000,
            },
            &records,
        );
        assert_eq!(stats.last_record_date.as_deref(), Some("2026-07-02"));
        assert_eq!(stats.category_counts["PROJECT"], 2);
    }

    #[test]
    fn dashboard_year_scopes_only_the_recent_list() {
        let mut records: Vec<_> = (0..3)
            .map(|i| rec(&format!("p{i}"), "PROJECT", "2025", None))
            .collect();
        records.push(rec("t0", "TEAMWORK", "2026", None));
        records.push(rec("t1", "TEAMWORK", "2026", None));

        let dash = dashboard(&records, Some("2026".to_string()));
        // Signals cover the whole history, not the requested year
        assert!((dash.competency_index - 38.5).abs() < 1e-9);
        assert_eq!(dash.collaboration_level, 1);
        assert_eq!(dash.total_projects, 3);
        // Only the recent list is year-scoped
        assert_eq!(dash.recent_records.len(), 2);
        assert!(dash.recent_records.iter().all(|r| r.year == "2026"));
    }

    #[test]
    fn dashboard_caps_recent_list_at_five_preserving_order() {
        let records: Vec<_> = (0..8)
            .map(|i| rec(&format!("r{i}"), "PROJECT", "2026", None))
            .collect();
        let dash = dashboard(&records, Some("2026".to_string()));
        assert_eq!(dash.total_projects, 8);
        assert_eq!(dash.recent_records.len(), 5);
        assert_eq!(dash.recent_records[0].id, "r0");
    }

    #[test]
    fn records_this_month_counts_dated_records_only() {
        let now = Utc::now();
        let this_month = format!("{:04}-{:02}-15", now.year(), now.month());
        let records = vec![
            rec("a", "PROJECT", "2026", Some(&this_month)),
            rec("b", "PROJECT", "2026", None),
            rec("c", "PROJECT", "2020", Some("2020-01-15")),
        ];
        let stats = user_stats(
            Progress {
                level: 1,
                exp: 0,
                max_exp: 1000,
            },
            &records,
        );
        assert_eq!(stats.records_this_month, 1);
    }
}
