use crate::AppContext;
use axum::{extract::State, Json};
use serde_json::{json, Value};
use std::sync::Arc;

pub async fn health(State(ctx): State<Arc<AppContext>>) -> Json<Value> {
    let uptime = ctx.started_at.elapsed().as_secs();
    let database = if ctx.storage.ping().await { "ok" } else { "down" };
    Json(json!({
        "success": true,
        "data": {
            "status": "ok",
            "database": database,
            "ai_configured": ctx.gateway.is_configured(),
            "uptime_secs": uptime,
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}
