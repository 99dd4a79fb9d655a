// SPDX-License-Identifier: MIT
//! Activity record model — the closed category set, the serialisable
//! record shape, and year derivation.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Status applied when a record is created without one.
pub const DEFAULT_STATUS: &str = "in progress";

/// The fixed, closed set of activity categories. New records are
/// validated against this set at the boundary; stored values are carried
/// as literal strings so aggregation never chokes on legacy data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Project,
    Class,
    Extracurricular,
    Teamwork,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Project => "PROJECT",
            Category::Class => "CLASS",
            Category::Extracurricular => "EXTRACURRICULAR",
            Category::Teamwork => "TEAMWORK",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PROJECT" => Some(Category::Project),
            "CLASS" => Some(Category::Class),
            "EXTRACURRICULAR" => Some(Category::Extracurricular),
            "TEAMWORK" => Some(Category::Teamwork),
            _ => None,
        }
    }
}

/// One logged activity. `year` is derived, not user-supplied: from `date`
/// when present, else from the creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub id: String,
    pub user_id: String,
    pub title: String,
    /// Category literal, normally one of [`Category`].
    pub category: String,
    /// ISO 8601 calendar date the activity occurred on, e.g. `"2026-03-14"`.
    pub date: Option<String>,
    pub description: Option<String>,
    /// Long-form detail text; only an excerpt of it reaches the AI context.
    pub content: Option<String>,
    pub tags: Vec<String>,
    /// Four-digit year string, e.g. `"2026"`.
    pub year: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Derive the four-digit year string for a record.
///
/// An unparseable `date` falls back to the current year rather than
/// failing the write.
pub fn derive_year(date: Option<&str>) -> String {
    date.and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
        .map(|d| d.year().to_string())
        .unwrap_or_else(|| Utc::now().year().to_string())
}
