// rest/routes/resume_base.rs — Per-category resume snippets.
//
// PUT is an upsert keyed on (user, category): the first write creates,
// later writes overwrite in place.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::rest::ok;
use crate::storage::ResumeBaseRow;
use crate::AppContext;

fn snippet_json(row: &ResumeBaseRow) -> Value {
    json!({
        "id": row.id,
        "user_id": row.user_id,
        "category": row.category,
        "title": row.title,
        "content": row.content,
        "keywords": row.keywords_vec(),
        "created_at": row.created_at,
        "updated_at": row.updated_at,
    })
}

#[derive(Deserialize)]
pub struct ListSnippetsQuery {
    pub category: Option<String>,
}

pub async fn list_snippets(
    State(ctx): State<Arc<AppContext>>,
    Path(user_id): Path<String>,
    Query(query): Query<ListSnippetsQuery>,
) -> Result<Json<Value>, AppError> {
    let snippets = ctx
        .storage
        .list_resume_base(&user_id, query.category.as_deref())
        .await?;
    let list: Vec<Value> = snippets.iter().map(snippet_json).collect();
    Ok(ok(list))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertSnippetRequest {
    pub category: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

pub async fn upsert_snippet(
    State(ctx): State<Arc<AppContext>>,
    Path(user_id): Path<String>,
    Json(body): Json<UpsertSnippetRequest>,
) -> Result<Json<Value>, AppError> {
    if body.category.trim().is_empty() {
        return Err(AppError::missing("category"));
    }
    if body.title.trim().is_empty() {
        return Err(AppError::missing("title"));
    }
    let keywords =
        serde_json::to_string(&body.keywords).map_err(|e| AppError::Internal(e.into()))?;
    let snippet = ctx
        .storage
        .upsert_resume_base(&user_id, &body.category, &body.title, &body.content, &keywords)
        .await?;
    Ok(ok(snippet_json(&snippet)))
}
