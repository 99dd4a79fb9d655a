pub mod aggregation;
pub mod ai;
pub mod analytics;
pub mod config;
pub mod error;
pub mod observability;
pub mod progression;
pub mod records;
pub mod rest;
pub mod storage;

use std::sync::Arc;
use std::time::Duration;

use ai::transport::{DirectTransport, GenerationTransport, LambdaTransport};
use ai::DraftGateway;
use config::ServiceConfig;
use error::AppError;
use storage::Storage;

/// Shared application state passed to every request handler.
pub struct AppContext {
    pub config: ServiceConfig,
    pub storage: Storage,
    pub gateway: DraftGateway,
    pub started_at: std::time::Instant,
}

impl AppContext {
    pub fn new(config: ServiceConfig, storage: Storage, gateway: DraftGateway) -> Self {
        Self {
            config,
            storage,
            gateway,
            started_at: std::time::Instant::now(),
        }
    }
}

/// Build the generation transport selected by `[ai]` config.
pub fn build_transport(config: &ServiceConfig) -> Result<Arc<dyn GenerationTransport>, AppError> {
    let timeout = Duration::from_secs(config.ai.timeout_secs);
    match config.ai.mode.as_str() {
        "direct" => Ok(Arc::new(DirectTransport::new(
            config.ai.base_url.clone(),
            config.ai.model.clone(),
            config.ai.api_key.clone(),
            timeout,
        )?)),
        _ => Ok(Arc::new(LambdaTransport::new(
            config.ai.resume_url.clone(),
            config.ai.interview_url.clone(),
            timeout,
        )?)),
    }
}
