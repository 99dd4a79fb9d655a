// SPDX-License-Identifier: MIT
//! AI draft gateway.
//!
//! Single entry point for every generation feature. The gateway validates
//! inputs, selects and renders activity records, hands the assembled prompt
//! to the configured [`GenerationTransport`], and normalizes whatever comes
//! back into the two stable response shapes the API serves.

pub mod context;
pub mod transport;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AppError;
use crate::records::ActivityRecord;
use context::{build_activity_context, word_count, ContextMode};
use transport::{GenerationTransport, InterviewPrompt, ResumePrompt};

/// Interview generation works from the most recent records only.
const INTERVIEW_RECORD_CAP: usize = 10;

/// Hard ceiling on returned interview questions. Excess entries from the
/// provider are dropped, not an error.
const MAX_INTERVIEW_QUESTIONS: usize = 5;

/// A record that contributed to a generated draft, echoed back so the client
/// can show provenance.
#[derive(Debug, Clone, Serialize)]
pub struct UsedRecord {
    pub id: String,
    pub title: String,
    pub category: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResumeDraft {
    pub draft: String,
    pub word_count: usize,
    pub used_records: Vec<UsedRecord>,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewQuestion {
    pub question: String,
    pub intent: String,
    pub tip: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct InterviewSet {
    pub questions: Vec<InterviewQuestion>,
    pub total_questions: usize,
    pub generated_at: String,
}

pub struct DraftGateway {
    transport: Arc<dyn GenerationTransport>,
}

impl DraftGateway {
    pub fn new(transport: Arc<dyn GenerationTransport>) -> Self {
        Self { transport }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_configured()
    }

    /// Generate a draft answer to an application question.
    ///
    /// `records` must already be the caller's records in recency order;
    /// `record_ids`, when present, narrows the selection without reordering.
    pub async fn resume_draft(
        &self,
        records: &[ActivityRecord],
        record_ids: Option<&[String]>,
        company_info: &str,
        job_type: &str,
        question: &str,
    ) -> Result<ResumeDraft, AppError> {
        require_non_blank("companyInfo", company_info)?;
        require_non_blank("jobType", job_type)?;
        require_non_blank("question", question)?;
        self.require_configured()?;

        let selected = select_records(records, record_ids, None);
        let activity_context = build_activity_context(&selected, ContextMode::Resume);

        let draft = self
            .transport
            .generate_resume(&ResumePrompt {
                company_info,
                job_type,
                question,
                activity_context: &activity_context,
            })
            .await?;

        Ok(ResumeDraft {
            word_count: word_count(&draft),
            used_records: selected
                .iter()
                .map(|r| UsedRecord {
                    id: r.id.clone(),
                    title: r.title.clone(),
                    category: r.category.clone(),
                })
                .collect(),
            generated_at: Utc::now().to_rfc3339(),
            draft,
        })
    }

    /// Generate up to five tailored interview questions.
    pub async fn interview_questions(
        &self,
        records: &[ActivityRecord],
        record_ids: Option<&[String]>,
        company_info: &str,
        job_type: Option<&str>,
    ) -> Result<InterviewSet, AppError> {
        require_non_blank("companyInfo", company_info)?;
        self.require_configured()?;

        let selected = select_records(records, record_ids, Some(INTERVIEW_RECORD_CAP));
        let activity_context = build_activity_context(&selected, ContextMode::Interview);

        let payload = self
            .transport
            .generate_interview(&InterviewPrompt {
                company_info,
                job_type,
                activity_context: &activity_context,
            })
            .await?;

        let questions = normalize_questions(payload)?;
        Ok(InterviewSet {
            total_questions: questions.len(),
            questions,
            generated_at: Utc::now().to_rfc3339(),
        })
    }

    fn require_configured(&self) -> Result<(), AppError> {
        if self.transport.is_configured() {
            Ok(())
        } else {
            Err(AppError::ServiceUnavailable(
                "generation transport is not configured".into(),
            ))
        }
    }
}

fn require_non_blank(field: &'static str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::missing(field))
    } else {
        Ok(())
    }
}

/// Narrow `records` to the requested ids (order preserved from `records`,
/// unknown ids ignored), then apply the cap.
fn select_records(
    records: &[ActivityRecord],
    record_ids: Option<&[String]>,
    cap: Option<usize>,
) -> Vec<ActivityRecord> {
    let mut selected: Vec<ActivityRecord> = match record_ids {
        Some(ids) if !ids.is_empty() => records
            .iter()
            .filter(|r| ids.contains(&r.id))
            .cloned()
            .collect(),
        _ => records.to_vec(),
    };
    if let Some(cap) = cap {
        selected.truncate(cap);
    }
    selected
}

/// Accepts either a bare array or `{"questions": [...]}`. Each entry must
/// carry string `question`, `intent`, and `tip` fields; anything else is a
/// hard failure rather than a silently partial set.
fn normalize_questions(payload: Value) -> Result<Vec<InterviewQuestion>, AppError> {
    let items = match &payload {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => map
            .get("questions")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .ok_or_else(|| {
                AppError::ResponseFormat("question payload is not an array".into())
            })?,
        _ => {
            return Err(AppError::ResponseFormat(
                "question payload is not an array".into(),
            ))
        }
    };

    items
        .iter()
        .take(MAX_INTERVIEW_QUESTIONS)
        .map(|item| {
            let field = |name: &str| {
                item.get(name)
                    .and_then(Value::as_str)
                    .map(String::from)
                    .ok_or_else(|| {
                        AppError::ResponseFormat(format!("question entry missing `{name}`"))
                    })
            };
            Ok(InterviewQuestion {
                question: field("question")?,
                intent: field("intent")?,
                tip: field("tip")?,
            })
        })
        .collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
