//! PostgreSQL storage for the Folio ledger engine.
//!
//! This crate provides:
//! - `SeaORM` entity definitions, one per table
//! - The schema migration
//! - [`PgStore`], a [`folio_core::store::LedgerStore`] over PostgreSQL

#[allow(missing_docs)]
pub mod entities;
pub mod migration;
pub mod store;

pub use store::{PgStore, PgTx, db_err};

use folio_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    tracing::debug!(max_connections = config.max_connections, "Connecting to database");
    Database::connect(options).await
}
