// SPDX-License-Identifier: MIT
//! Aggregation engine — facet filtering and per-bucket counts over
//! activity records, plus the dashboard's derived signals.
//!
//! All functions are pure and total over well-formed input: an empty
//! record set yields empty maps and zero scores, never an error. Unknown
//! category or year values are counted under their literal value — no
//! "other" bucket merging.

use std::collections::HashMap;

use crate::records::ActivityRecord;

/// A set of optional filter dimensions. An absent facet is a wildcard.
#[derive(Debug, Clone, Default)]
pub struct Facets {
    pub year: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
}

/// Keep the records matching every specified facet exactly (string
/// equality, no fuzzy matching). Input order is preserved, so the result
/// keeps the store's recency ordering. With no facets this is the
/// identity, and filtering is idempotent.
pub fn filter_by_facets(records: &[ActivityRecord], facets: &Facets) -> Vec<ActivityRecord> {
    records
        .iter()
        .filter(|r| {
            facets.year.as_deref().is_none_or(|y| r.year == y)
                && facets.category.as_deref().is_none_or(|c| r.category == c)
                && facets.status.as_deref().is_none_or(|s| r.status == s)
        })
        .cloned()
        .collect()
}

/// Count records per category value. Categories with zero records are
/// omitted — the display layer renders `0` for missing keys.
pub fn count_by_category(records: &[ActivityRecord]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for r in records {
        *counts.entry(r.category.clone()).or_insert(0) += 1;
    }
    counts
}

/// Count records per derived year string, keyed by the literal value.
pub fn count_by_year(records: &[ActivityRecord]) -> HashMap<String, u64> {
    let mut counts = HashMap::new();
    for r in records {
        *counts.entry(r.year.clone()).or_insert(0) += 1;
    }
    counts
}

/// Linear-saturating competency signal: `min(count * 7.7, 100)` rounded
/// to one decimal. The constant and the cap are a fixed contract, not a
/// statistical model.
pub fn competency_index(total_record_count: u64) -> f64 {
    let raw = (total_record_count as f64 * 7.7).min(100.0);
    (raw * 10.0).round() / 10.0
}

/// Collaboration signal: one level per 3 records, capped at 10.
pub fn collaboration_level(total_record_count: u64) -> u64 {
    (total_record_count / 3).min(10)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(category: &str, year: &str, status: &str) -> ActivityRecord {
        ActivityRecord {
            id: format!("r-{category}-{year}-{status}"),
            user_id: "u1".to_string(),
            title: "t".to_string(),
            category: category.to_string(),
            date: None,
            description: None,
            content: None,
            tags: vec![],
            year: year.to_string(),
            status: status.to_string(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn no_facets_is_identity() {
        let records = vec![rec("PROJECT", "2025", "done"), rec("CLASS", "2026", "in progress")];
        let out = filter_by_facets(&records, &Facets::default());
        assert_eq!(out.len(), records.len());
        assert_eq!(out[0].id, records[0].id);
        assert_eq!(out[1].id, records[1].id);
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = vec![
            rec("PROJECT", "2025", "done"),
            rec("PROJECT", "2026", "done"),
            rec("TEAMWORK", "2026", "done"),
        ];
        let facets = Facets {
            year: Some("2026".to_string()),
            ..Default::default()
        };
        let once = filter_by_facets(&records, &facets);
        let twice = filter_by_facets(&once, &facets);
        assert_eq!(once.len(), 2);
        assert_eq!(once.len(), twice.len());
    }

    #[test]
    fn all_facets_must_match() {
        let records = vec![
            rec("PROJECT", "2026", "done"),
            rec("PROJECT", "2026", "in progress"),
            rec("CLASS", "2026", "done"),
        ];
        let facets = Facets {
            year: Some("2026".to_string()),
            category: Some("PROJECT".to_string()),
            status: Some("done".to_string()),
        };
        let out = filter_by_facets(&records, &facets);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].category, "PROJECT");
    }

    #[test]
    fn empty_input_yields_empty_outputs() {
        assert!(filter_by_facets(&[], &Facets::default()).is_empty());
        assert!(count_by_category(&[]).is_empty());
        assert!(count_by_year(&[]).is_empty());
    }

    #[test]
    fn unknown_category_counts_under_its_literal_value() {
        let records = vec![rec("PROJECT", "2026", "done"), rec("HOBBY", "2026", "done")];
        let by_cat = count_by_category(&records);
        assert_eq!(by_cat.get("PROJECT"), Some(&1));
        assert_eq!(by_cat.get("HOBBY"), Some(&1));
    }

    #[test]
    fn counts_omit_zero_buckets() {
        let records = vec![rec("PROJECT", "2025", "done"), rec("PROJECT", "2026", "done")];
        let by_cat = count_by_category(&records);
        assert_eq!(by_cat.get("PROJECT"), Some(&2));
        assert_eq!(by_cat.get("CLASS"), None);

        let by_year = count_by_year(&records);
        assert_eq!(by_year.get("2025"), Some(&1));
        assert_eq!(by_year.get("2026"), Some(&1));
    }

    #[test]
    fn competency_index_contract() {
        assert_eq!(competency_index(0), 0.0);
        assert_eq!(competency_index(5), 38.5);
        // 20 * 7.7 = 154, capped at 100.
        assert_eq!(competency_index(20), 100.0);
    }

    #[test]
    fn collaboration_level_caps_at_ten() {
        assert_eq!(collaboration_level(0), 0);
        assert_eq!(collaboration_level(29), 9);
        assert_eq!(collaboration_level(30), 10);
        assert_eq!(collaboration_level(100), 10);
    }
}
