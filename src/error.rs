//! Request-level error taxonomy.
//!
//! Every error is scoped to the request that raised it and is turned into
//! a `{success: false, error}` JSON body at the boundary — nothing here is
//! fatal to the process. The pure engines (progression, aggregation) only
//! produce `Validation`; the AI gateway owns the external failure modes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// Missing or invalid required input — user-correctable, reported with
    /// the offending field.
    #[error("invalid input for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The generation provider is not configured or reachable; checked
    /// before any call is attempted.
    #[error("AI generation service is unavailable: {0}")]
    ServiceUnavailable(String),

    /// The provider was reachable but the call failed or timed out.
    #[error("AI generation failed: {0}")]
    Generation(String),

    /// The provider returned an unparseable or malformed payload.
    #[error("AI provider returned a malformed response: {0}")]
    ResponseFormat(String),

    /// Concurrent update hazard on the progression fields.
    #[error("progression state changed concurrently; retry the request")]
    Conflict,

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Shorthand for a missing required field.
    pub fn missing(field: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: format!("{field} is required"),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Generation(_) | AppError::ResponseFormat(_) => StatusCode::BAD_GATEWAY,
            AppError::Conflict => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
