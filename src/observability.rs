// SPDX-License-Identifier: MIT
//! Observability utilities — request latency tracking.

use std::time::Instant;
use tracing::{debug, info};

/// Track latency of an async operation and emit a structured log event.
pub struct LatencyTracker {
    operation: String,
    start: Instant,
}

impl LatencyTracker {
    /// Start tracking latency for an operation.
    ///
    /// Examples:
    ///   let tracker = LatencyTracker::start("ai.resume");
    pub fn start(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            start: Instant::now(),
        }
    }

    /// Finish tracking and emit a log event with the elapsed time.
    pub fn finish(self) {
        let elapsed_ms = self.start.elapsed().as_millis();
        if elapsed_ms > 1000 {
            // Slow operation — log at info level
            info!(
                operation = %self.operation,
                elapsed_ms = elapsed_ms,
                "slow operation"
            );
        } else {
            debug!(
                operation = %self.operation,
                elapsed_ms = elapsed_ms,
                "operation complete"
            );
        }
    }
}
