// rest/routes/users.rs — User profile and progression routes.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::error::AppError;
use crate::rest::ok;
use crate::storage::ExpAwardResult;
use crate::AppContext;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub name: String,
    #[serde(default)]
    pub major: String,
    #[serde(default)]
    pub character_title: String,
}

pub async fn create_user(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateUserRequest>,
) -> Result<Json<Value>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::missing("name"));
    }
    let user = ctx
        .storage
        .create_user(&body.name, &body.major, &body.character_title)
        .await?;
    Ok(ok(user))
}

pub async fn get_user(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let user = ctx
        .storage
        .get_user(&id)
        .await?
        .ok_or(AppError::NotFound { entity: "user" })?;
    Ok(ok(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub major: Option<String>,
    pub character_title: Option<String>,
}

pub async fn update_user(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserRequest>,
) -> Result<Json<Value>, AppError> {
    if body.name.is_none() && body.major.is_none() && body.character_title.is_none() {
        return Err(AppError::Validation {
            field: "body".to_string(),
            message: "at least one field must be provided".to_string(),
        });
    }
    let user = ctx
        .storage
        .update_user_profile(
            &id,
            body.name.as_deref(),
            body.major.as_deref(),
            body.character_title.as_deref(),
        )
        .await?
        .ok_or(AppError::NotFound { entity: "user" })?;
    Ok(ok(user))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardExpRequest {
    pub amount: i64,
}

pub async fn award_exp(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<AwardExpRequest>,
) -> Result<Json<Value>, AppError> {
    if body.amount <= 0 {
        return Err(AppError::Validation {
            field: "amount".to_string(),
            message: "amount must be positive".to_string(),
        });
    }
    match ctx.storage.award_user_exp(&id, body.amount).await? {
        ExpAwardResult::Applied(award) => Ok(ok(award)),
        ExpAwardResult::UserMissing => Err(AppError::NotFound { entity: "user" }),
        ExpAwardResult::Conflict => Err(AppError::Conflict),
    }
}
