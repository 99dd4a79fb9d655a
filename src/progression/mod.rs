// SPDX-License-Identifier: MIT
//! Progression engine — converts an EXP award into a possibly
//! multi-level-up state transition.
//!
//! Pure snapshot-in / snapshot-out: callers (REST handlers, storage
//! transactions, tests) pass the current `Progress` and receive the next
//! one. Persistence and concurrency control are the caller's job.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// EXP granted for creating an activity record.
pub const RECORD_CREATION_EXP: i64 = 15;

/// Per-level threshold growth: `max_exp` increases by 20% (floored) on
/// every level-up. Recomputed only after the current threshold is
/// consumed — the order matters for multi-level awards.
const THRESHOLD_GROWTH_NUM: i64 = 12;
const THRESHOLD_GROWTH_DEN: i64 = 10;

/// A user's progression snapshot. Invariant after any completed award:
/// `0 <= exp < max_exp`. `level` never decreases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub level: i64,
    pub exp: i64,
    pub max_exp: i64,
}

/// Result of applying one EXP award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwardOutcome {
    pub progress: Progress,
    pub leveled_up: bool,
    pub levels_gained: i64,
}

/// Apply an EXP award to `current`.
///
/// Rejects non-positive amounts before touching anything. Otherwise always
/// succeeds — there is no upper bound on level. Awards large enough to
/// cross several thresholds are handled by the loop; each iteration
/// consumes the current `max_exp` and then grows it by 20% (truncating).
pub fn award_experience(current: Progress, amount: i64) -> Result<AwardOutcome, AppError> {
    if amount <= 0 {
        return Err(AppError::Validation {
            field: "exp_amount".to_string(),
            message: "EXP amount must be a positive integer".to_string(),
        });
    }

    let mut next = current;
    next.exp += amount;
    let mut levels_gained = 0;

    while next.exp >= next.max_exp {
        next.exp -= next.max_exp;
        next.level += 1;
        next.max_exp = next.max_exp * THRESHOLD_GROWTH_NUM / THRESHOLD_GROWTH_DEN;
        levels_gained += 1;
    }

    Ok(AwardOutcome {
        progress: next,
        leveled_up: levels_gained > 0,
        levels_gained,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
