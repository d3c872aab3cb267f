//! Database migration runner for Folio.
//!
//! Usage:
//!   folio-migrator up      - Run all pending migrations
//!   folio-migrator down    - Rollback last migration
//!   folio-migrator status  - Show migration status
//!   folio-migrator fresh   - Drop all tables and re-run migrations
//!
//! The database URL comes from `FOLIO__DATABASE__URL` or the config files.

use std::process::ExitCode;

use folio_db::migration::Migrator;
use folio_shared::FolioConfig;
use folio_shared::telemetry::init_tracing;
use sea_orm_migration::MigratorTrait;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match FolioConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = init_tracing(&config.logging) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let command = std::env::args().nth(1).unwrap_or_else(|| "up".to_string());
    let db = match folio_db::connect(&config.database).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!(error = %e, "Failed to connect to database");
            return ExitCode::FAILURE;
        }
    };

    let result = match command.as_str() {
        "up" => Migrator::up(&db, None).await,
        "down" => Migrator::down(&db, Some(1)).await,
        "status" => Migrator::status(&db).await,
        "fresh" => Migrator::fresh(&db).await,
        other => {
            tracing::error!(command = other, "Unknown command, expected up, down, status or fresh");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(()) => {
            tracing::info!(command = %command, "Migration finished");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(command = %command, error = %e, "Migration failed");
            ExitCode::FAILURE
        }
    }
}
