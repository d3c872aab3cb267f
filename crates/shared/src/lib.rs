//! Shared types, errors, and configuration for Folio.
//!
//! This crate provides common types used across all other crates:
//! - Money and currency types with decimal precision
//! - Typed IDs for type-safe entity references
//! - Application-wide error types
//! - Configuration management
//! - Tracing bootstrap
//! - The HTTP exchange-rate feed client

pub mod config;
pub mod error;
pub mod rate_feed;
pub mod telemetry;
pub mod types;

pub use self::config::{FolioConfig, ReturnTaxPolicy};
pub use error::{AppError, AppResult};
pub use rate_feed::RateFeedClient;
