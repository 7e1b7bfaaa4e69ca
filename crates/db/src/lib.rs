//! Postgres persistence for the Tally posting engine.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Implementations of the core store traits (ledger, rules, assets)
//! - Chart of accounts and tenant profile repositories
//! - Database migrations

pub mod entities;
pub mod error;
pub mod migration;
pub mod repositories;
pub mod store;

pub use error::store_error;
pub use repositories::{AccountRepository, TenantProfileRepository};
pub use store::{PgLedgerStore, PgRuleStore};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::config::DatabaseConfig;

/// Establishes a connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    Database::connect(database_url).await
}

/// Establishes a pooled connection sized by the configuration.
pub async fn connect_with(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
