// rest/routes/community.rs — Senior/friend directory.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::rest::ok;
use crate::storage::CommunityRow;
use crate::AppContext;

const DEFAULT_LIST_LIMIT: i64 = 50;
const VALID_ROLES: [&str; 2] = ["senior", "friend"];

fn member_json(row: &CommunityRow) -> Value {
    json!({
        "id": row.id,
        "name": row.name,
        "major": row.major,
        "level": row.level,
        "job": row.job,
        "tags": row.tags_vec(),
        "role": row.role,
        "created_at": row.created_at,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMembersQuery {
    pub role: Option<String>,
    pub tag: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_members(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListMembersQuery>,
) -> Result<Json<Value>, AppError> {
    if let Some(role) = query.role.as_deref() {
        if !VALID_ROLES.contains(&role) {
            return Err(AppError::Validation {
                field: "role".to_string(),
                message: format!("unknown role '{role}'"),
            });
        }
    }
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 200);
    let members = ctx
        .storage
        .list_community(query.role.as_deref(), query.tag.as_deref(), limit)
        .await?;
    let list: Vec<Value> = members.iter().map(member_json).collect();
    Ok(ok(list))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    pub name: String,
    #[serde(default)]
    pub major: String,
    #[serde(default = "default_level")]
    pub level: i64,
    #[serde(default)]
    pub job: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub role: String,
}

fn default_level() -> i64 {
    1
}

pub async fn create_member(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateMemberRequest>,
) -> Result<Json<Value>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::missing("name"));
    }
    if !VALID_ROLES.contains(&body.role.as_str()) {
        return Err(AppError::Validation {
            field: "role".to_string(),
            message: format!("unknown role '{}'", body.role),
        });
    }
    let tags = serde_json::to_string(&body.tags).map_err(|e| AppError::Internal(e.into()))?;
    let member = ctx
        .storage
        .create_community_member(&body.name, &body.major, body.level, &body.job, &tags, &body.role)
        .await?;
    Ok(ok(member_json(&member)))
}
