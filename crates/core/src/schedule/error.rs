//! Scheduler error types.
//!
//! Pause windows and end dates are not errors: they are reported as
//! skips in the run log and in [`RunOutcome`](super::RunOutcome).

use tally_shared::types::RecurringRuleId;
use thiserror::Error;

use crate::ledger::error::{FieldError, StoreError};

/// Errors raised by rule management and manual runs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// No rule with this id.
    #[error("Recurring rule {0} not found")]
    RuleNotFound(RecurringRuleId),

    /// The rule definition is malformed.
    #[error("Invalid recurring rule: {}", .0.iter().map(|e| format!("{}: {}", e.field, e.message)).collect::<Vec<_>>().join("; "))]
    InvalidRule(Vec<FieldError>),

    /// Rule store failure, including a lost compare-and-swap.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SchedulerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RuleNotFound(_) => "RULE_NOT_FOUND",
            Self::InvalidRule(_) => "VALIDATION_FAILED",
            Self::Store(StoreError::Conflict) => "CONCURRENT_MODIFICATION",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidRule(_) => 400,
            Self::RuleNotFound(_) => 404,
            Self::Store(StoreError::Conflict) => 409,
            Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }
}
