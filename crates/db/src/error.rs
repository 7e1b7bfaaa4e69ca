//! Mapping of database errors onto the core store errors.

use std::fmt::Display;

use sea_orm::{DbErr, SqlErr};
use tally_core::ledger::StoreError;

/// Converts a `SeaORM` error into a [`StoreError`].
///
/// Unique violations keep the constraint name so callers can tell a
/// reference race from an invoice-number race.
pub fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(message)) => {
            StoreError::UniqueViolation(constraint_name(&message))
        }
        _ => StoreError::Backend(err.to_string()),
    }
}

/// A stored value the domain types cannot represent.
pub(crate) fn corrupt(column: &str, detail: impl Display) -> StoreError {
    StoreError::Backend(format!("Invalid value in {column}: {detail}"))
}

/// Extracts `name` from `... unique constraint "name"`.
fn constraint_name(message: &str) -> String {
    message
        .split('"')
        .nth(1)
        .map_or_else(|| message.to_string(), str::to_string)
}
