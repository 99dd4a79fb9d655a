// rest/routes/ai.rs — Generation endpoints.
//
// Handlers fetch the caller's records in activity-date order and hand
// everything to the gateway, which owns validation, context assembly,
// and response normalization.

use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AppError;
use crate::observability::LatencyTracker;
use crate::records::ActivityRecord;
use crate::rest::ok;
use crate::AppContext;

async fn user_records_by_date(
    ctx: &AppContext,
    user_id: &str,
) -> Result<Vec<ActivityRecord>, AppError> {
    if ctx.storage.get_user(user_id).await?.is_none() {
        return Err(AppError::NotFound { entity: "user" });
    }
    let rows = ctx.storage.list_user_records_by_date(user_id).await?;
    Ok(rows.into_iter().map(|r| r.into_activity()).collect())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeDraftRequest {
    pub user_id: String,
    #[serde(default)]
    pub company_info: String,
    #[serde(default)]
    pub job_type: String,
    #[serde(default)]
    pub question: String,
    pub record_ids: Option<Vec<String>>,
}

pub async fn resume_draft(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<ResumeDraftRequest>,
) -> Result<Json<Value>, AppError> {
    if body.user_id.trim().is_empty() {
        return Err(AppError::missing("userId"));
    }
    let records = user_records_by_date(&ctx, &body.user_id).await?;
    let tracker = LatencyTracker::start("ai.resume");
    let draft = ctx
        .gateway
        .resume_draft(
            &records,
            body.record_ids.as_deref(),
            &body.company_info,
            &body.job_type,
            &body.question,
        )
        .await?;
    tracker.finish();
    Ok(ok(draft))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewRequest {
    pub user_id: String,
    #[serde(default)]
    pub company_info: String,
    pub job_type: Option<String>,
    pub record_ids: Option<Vec<String>>,
}

pub async fn interview_questions(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<InterviewRequest>,
) -> Result<Json<Value>, AppError> {
    if body.user_id.trim().is_empty() {
        return Err(AppError::missing("userId"));
    }
    let records = user_records_by_date(&ctx, &body.user_id).await?;
    let tracker = LatencyTracker::start("ai.interview");
    let questions = ctx
        .gateway
        .interview_questions(
            &records,
            body.record_ids.as_deref(),
            &body.company_info,
            body.job_type.as_deref(),
        )
        .await?;
    tracker.finish();
    Ok(ok(questions))
}
