//! Posting and store error types.
//!
//! Duplicate submissions are not errors: they come back as a successful
//! [`PostingResult`](super::types::PostingResult) with `is_existing` set.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Dotted path of the offending field (e.g. `line_items[2].amount`).
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Creates a field error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors raised by ledger, rule and asset stores.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint rejected the write (reference or invoice number race).
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// A compare-and-swap lost against a concurrent writer.
    #[error("Concurrent modification detected")]
    Conflict,

    /// Row not found.
    #[error("Record not found")]
    NotFound,

    /// Any other backend failure.
    #[error("Store error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Returns true if retrying the whole operation may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

/// Errors that can occur while posting an event.
#[derive(Debug, Error)]
pub enum PostingError {
    // ========== Input Errors ==========
    /// Malformed event; never retried automatically.
    #[error("Validation failed: {}", summarize(.0))]
    Validation(Vec<FieldError>),

    // ========== Chart Errors ==========
    /// Codes the journal needs are not active accounts in the tenant's chart.
    #[error("Accounts not found: {}", .0.join(", "))]
    AccountsNotFound(Vec<String>),

    /// Neither the catch-all nor the secondary default expense account exists.
    #[error("No fallback expense account exists in the chart")]
    FallbackAccountMissing,

    // ========== Invariant Errors ==========
    /// Debits and credits differ by more than the rounding tolerance.
    #[error("Journal is not balanced. Debit: {debits}, Credit: {credits}")]
    InvariantViolation {
        /// Total debits.
        debits: Decimal,
        /// Total credits.
        credits: Decimal,
    },

    // ========== Target Errors ==========
    /// A payment, void or depreciation target does not exist.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    // ========== Store Errors ==========
    /// Ledger store failure; the unit of work was rolled back.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl PostingError {
    /// Shorthand for a single-field validation error.
    #[must_use]
    pub fn invalid(field: &str, message: &str) -> Self {
        Self::Validation(vec![FieldError::new(field, message)])
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::AccountsNotFound(_) => "ACCOUNTS_NOT_FOUND",
            Self::FallbackAccountMissing => "FALLBACK_ACCOUNT_MISSING",
            Self::InvariantViolation { .. } => "ACCOUNTING_INVARIANT_VIOLATION",
            Self::TargetNotFound(_) => "TARGET_NOT_FOUND",
            Self::Store(_) => "STORE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - caller input
            Self::Validation(_) => 400,

            // 404 Not Found
            Self::TargetNotFound(_) => 404,

            // 409 Conflict - lost race that could not be resolved to a winner
            Self::Store(StoreError::Conflict) => 409,

            // 422 Unprocessable - tenant setup is incomplete
            Self::AccountsNotFound(_) | Self::FallbackAccountMissing => 422,

            // 500 Internal Server Error
            Self::InvariantViolation { .. } | Self::Store(_) => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_retryable())
    }

    /// Field errors, if this is a validation failure.
    #[must_use]
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Validation(errors) => errors,
            _ => &[],
        }
    }
}
