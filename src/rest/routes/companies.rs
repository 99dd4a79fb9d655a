// rest/routes/companies.rs — Company profile CRUD and search.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::AppError;
use crate::rest::ok;
use crate::storage::CompanyRow;
use crate::AppContext;

const VALID_HALVES: [&str; 2] = ["H1", "H2"];

fn company_json(row: &CompanyRow) -> Value {
    json!({
        "id": row.id,
        "name": row.name,
        "year": row.year,
        "half": row.half,
        "metadata": row.metadata_value(),
        "created_at": row.created_at,
        "updated_at": row.updated_at,
    })
}

fn validate_half(half: Option<&str>) -> Result<(), AppError> {
    if let Some(half) = half {
        if !VALID_HALVES.contains(&half) {
            return Err(AppError::Validation {
                field: "half".to_string(),
                message: format!("half must be H1 or H2, got '{half}'"),
            });
        }
    }
    Ok(())
}

fn metadata_json(metadata: &Option<Value>) -> Result<Option<String>, AppError> {
    match metadata {
        Some(value) => Ok(Some(
            serde_json::to_string(value).map_err(|e| AppError::Internal(e.into()))?,
        )),
        None => Ok(None),
    }
}

#[derive(Deserialize)]
pub struct ListCompaniesQuery {
    pub year: Option<String>,
    pub half: Option<String>,
    pub q: Option<String>,
}

pub async fn list_companies(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ListCompaniesQuery>,
) -> Result<Json<Value>, AppError> {
    validate_half(query.half.as_deref())?;
    let companies = ctx
        .storage
        .list_companies(query.year.as_deref(), query.half.as_deref(), query.q.as_deref())
        .await?;
    let list: Vec<Value> = companies.iter().map(company_json).collect();
    Ok(ok(list))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyRequest {
    pub name: String,
    pub year: Option<String>,
    pub half: Option<String>,
    pub metadata: Option<Value>,
}

pub async fn create_company(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<CreateCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::missing("name"));
    }
    validate_half(body.half.as_deref())?;
    let metadata = metadata_json(&body.metadata)?.unwrap_or_else(|| "{}".to_string());
    let company = ctx
        .storage
        .create_company(&body.name, body.year.as_deref(), body.half.as_deref(), &metadata)
        .await?;
    Ok(ok(company_json(&company)))
}

pub async fn get_company(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let company = ctx
        .storage
        .get_company(&id)
        .await?
        .ok_or(AppError::NotFound { entity: "company" })?;
    Ok(ok(company_json(&company)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyRequest {
    pub name: Option<String>,
    pub year: Option<String>,
    pub half: Option<String>,
    pub metadata: Option<Value>,
}

pub async fn update_company(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
    Json(body): Json<UpdateCompanyRequest>,
) -> Result<Json<Value>, AppError> {
    validate_half(body.half.as_deref())?;
    let metadata = metadata_json(&body.metadata)?;
    let company = ctx
        .storage
        .update_company(
            &id,
            body.name.as_deref(),
            body.year.as_deref(),
            body.half.as_deref(),
            metadata.as_deref(),
        )
        .await?
        .ok_or(AppError::NotFound { entity: "company" })?;
    Ok(ok(company_json(&company)))
}

pub async fn delete_company(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !ctx.storage.delete_company(&id).await? {
        return Err(AppError::NotFound { entity: "company" });
    }
    Ok(ok(json!({ "deleted": true })))
}
