// rest/mod.rs — Public REST API server.
//
// Axum HTTP server, local-only by default. Thin glue: handlers parse and
// validate, then delegate to storage, the engines, and the AI gateway.
//
// Endpoints (all under /api/v1, responses are `{success, data?, error?}`):
//   GET  /api/v1/health
//   POST /api/v1/users
//   GET  /api/v1/users/{id}
//   PUT  /api/v1/users/{id}
//   POST /api/v1/users/{id}/exp
//   GET  /api/v1/records            ?userId&year&category&status&limit&offset
//   POST /api/v1/records
//   GET  /api/v1/records/{id}
//   PUT  /api/v1/records/{id}
//   DELETE /api/v1/records/{id}
//   GET  /api/v1/community          ?role&tag&limit
//   POST /api/v1/community
//   GET  /api/v1/resume-base/{userId}  ?category
//   PUT  /api/v1/resume-base/{userId}
//   GET  /api/v1/companies          ?year&half&q
//   POST /api/v1/companies
//   GET/PUT/DELETE /api/v1/companies/{id}
//   GET  /api/v1/analytics/stats/{userId}
//   GET  /api/v1/analytics/dashboard/{userId}  ?year
//   POST /api/v1/ai/resume
//   POST /api/v1/ai/interview

pub mod routes;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::AppContext;

/// Success envelope shared by every handler.
pub(crate) fn ok(data: impl Serialize) -> Json<Value> {
    Json(json!({ "success": true, "data": data }))
}

pub async fn start_rest_server(ctx: Arc<AppContext>) -> Result<()> {
    let bind = format!("{}:{}", ctx.config.bind_address, ctx.config.port);
    let addr: SocketAddr = bind.parse()?;

    let router = build_router(ctx);

    info!("REST API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        // Health
        .route("/api/v1/health", get(routes::health::health))
        // Users + progression
        .route("/api/v1/users", post(routes::users::create_user))
        .route(
            "/api/v1/users/{id}",
            get(routes::users::get_user).put(routes::users::update_user),
        )
        .route("/api/v1/users/{id}/exp", post(routes::users::award_exp))
        // Activity records
        .route(
            "/api/v1/records",
            get(routes::records::list_records).post(routes::records::create_record),
        )
        .route(
            "/api/v1/records/{id}",
            get(routes::records::get_record)
                .put(routes::records::update_record)
                .delete(routes::records::delete_record),
        )
        // Community directory
        .route(
            "/api/v1/community",
            get(routes::community::list_members).post(routes::community::create_member),
        )
        // Resume base snippets
        .route(
            "/api/v1/resume-base/{user_id}",
            get(routes::resume_base::list_snippets).put(routes::resume_base::upsert_snippet),
        )
        // Company profiles
        .route(
            "/api/v1/companies",
            get(routes::companies::list_companies).post(routes::companies::create_company),
        )
        .route(
            "/api/v1/companies/{id}",
            get(routes::companies::get_company)
                .put(routes::companies::update_company)
                .delete(routes::companies::delete_company),
        )
        // Analytics
        .route(
            "/api/v1/analytics/stats/{user_id}",
            get(routes::analytics::user_stats),
        )
        .route(
            "/api/v1/analytics/dashboard/{user_id}",
            get(routes::analytics::dashboard),
        )
        // AI drafts
        .route("/api/v1/ai/resume", post(routes::ai::resume_draft))
        .route("/api/v1/ai/interview", post(routes::ai::interview_questions))
        .with_state(ctx)
}
