// rest/routes/analytics.rs — Stats and dashboard views.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::analytics;
use crate::error::AppError;
use crate::records::ActivityRecord;
use crate::rest::ok;
use crate::AppContext;

pub async fn user_stats(
    State(ctx): State<Arc<AppContext>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = ctx
        .storage
        .get_user(&user_id)
        .await?
        .ok_or(AppError::NotFound { entity: "user" })?;
    let rows = ctx.storage.list_user_records(&user_id).await?;
    let records: Vec<ActivityRecord> = rows.into_iter().map(|r| r.into_activity()).collect();

    let stats = analytics::user_stats(user.progress(), &records);
    Ok(ok(stats))
}

#[derive(Deserialize)]
pub struct DashboardQuery {
    pub year: Option<String>,
}

pub async fn dashboard(
    State(ctx): State<Arc<AppContext>>,
    Path(user_id): Path<String>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<Value>, AppError> {
    let user = ctx
        .storage
        .get_user(&user_id)
        .await?
        .ok_or(AppError::NotFound { entity: "user" })?;
    let rows = ctx.storage.list_user_records_by_date(&user_id).await?;
    let records: Vec<ActivityRecord> = rows.into_iter().map(|r| r.into_activity()).collect();

    let dashboard = analytics::dashboard(&records, query.year);
    Ok(ok(json!({
        "user": {
            "id": user.id,
            "name": user.name,
            "major": user.major,
            "character_title": user.character_title,
            "level_info": analytics::level_info(user.progress()),
        },
        "dashboard": dashboard,
    })))
}
