// rest/routes/records.rs — Activity record CRUD.
//
// Listing is recency-ordered, facet-filtered in process, then paginated.
// Creation awards the fixed record EXP in the same transaction as the
// insert.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::aggregation::{filter_by_facets, Facets};
use crate::error::AppError;
use crate::records::{derive_year, Category, ActivityRecord, DEFAULT_STATUS};
use crate::rest::ok;
use crate::storage::RecordCreation;
use crate::AppContext;

const DEFAULT_PAGE_LIMIT: usize = 50;

fn validate_category(value: &str) -> Result<(), AppError> {
    if Category::parse(value).is_some() {
        Ok(())
    } else {
        Err(AppError::Validation {
            field: "category".to_string(),
            message: format!("unknown category '{value}'"),
        })
    }
}

fn tags_json(tags: &Option<Vec<String>>) -> Result<Option<String>, AppError> {
    match tags {
        Some(tags) => Ok(Some(
            serde_json::to_string(tags).map_err(|e| AppError::Internal(e.into()))?,
        )),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRecordsQuery {
    pub user_id: Option<String>,
    pub year: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list_records(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Json<Value>, AppError> {
    let user_id = query.user_id.ok_or_else(|| AppError::missing("userId"))?;

    let rows = ctx.storage.list_user_records(&user_id).await?;
    let all: Vec<ActivityRecord> = rows.into_iter().map(|r| r.into_activity()).collect();

    let facets = Facets {
        year: query.year,
        category: query.category,
        status: query.status,
    };
    let filtered = filter_by_facets(&all, &facets);
    let total = filtered.len();

    let offset = query.offset.unwrap_or(0);
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    let page: Vec<&ActivityRecord> = filtered.iter().skip(offset).take(limit).collect();

    Ok(ok(json!({
        "records": page,
        "total": total,
        "limit": limit,
        "offset": offset,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    pub user_id: String,
    pub title: String,
    pub category: String,
    pub date: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

pub async fn create_record(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateRecordRequest>,
) -> Result<Json<Value>, AppError> {
    if body.user_id.trim().is_empty() {
        return Err(AppError::missing("userId"));
    }
    if body.title.trim().is_empty() {
        return Err(AppError::missing("title"));
    }
    validate_category(&body.category)?;

    let year = derive_year(body.date.as_deref());
    let tags = tags_json(&body.tags)?.unwrap_or_else(|| "[]".to_string());
    let status = body.status.as_deref().unwrap_or(DEFAULT_STATUS);

    let created = ctx
        .storage
        .create_record_and_award_exp(
            &body.user_id,
            &body.title,
            &body.category,
            body.date.as_deref(),
            body.description.as_deref(),
            body.content.as_deref(),
            &tags,
            &year,
            status,
        )
        .await?;

    match created {
        RecordCreation::Created { record, exp } => Ok(ok(json!({
            "record": record.into_activity(),
            "exp": exp,
        }))),
        RecordCreation::UserMissing => Err(AppError::NotFound { entity: "user" }),
        RecordCreation::Conflict => Err(AppError::Conflict),
    }
}

pub async fn get_record(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let record = ctx
        .storage
        .get_record(&id)
        .await?
        .ok_or(AppError::NotFound { entity: "record" })?;
    Ok(ok(record.into_activity()))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecordRequest {
    pub title: Option<String>,
    pub category: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
    pub status: Option<String>,
}

pub async fn update_record(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRecordRequest>,
) -> Result<Json<Value>, AppError> {
    if let Some(category) = body.category.as_deref() {
        validate_category(category)?;
    }
    // year tracks date; it is never set independently
    let year = body.date.as_deref().map(|d| derive_year(Some(d)));
    let tags = tags_json(&body.tags)?;

    let record = ctx
        .storage
        .update_record(
            &id,
            body.title.as_deref(),
            body.category.as_deref(),
            body.date.as_deref(),
            year.as_deref(),
            body.description.as_deref(),
            body.content.as_deref(),
            tags.as_deref(),
            body.status.as_deref(),
        )
        .await?
        .ok_or(AppError::NotFound { entity: "record" })?;
    Ok(ok(record.into_activity()))
}

pub async fn delete_record(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !ctx.storage.delete_record(&id).await? {
        return Err(AppError::NotFound { entity: "record" });
    }
    Ok(ok(json!({ "deleted": true })))
}
