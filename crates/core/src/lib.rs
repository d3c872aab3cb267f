//! Ledger consistency engine for Folio.
//!
//! Storage sits behind the traits in [`store`]; everything else is business
//! logic with no web or database dependencies.
//!
//! # Modules
//!
//! - `ledger` - Double-entry journal rules and the trial balance
//! - `fiscal` - Accounting periods and the period guard
//! - `currency` - Exchange rates, conversion and the rate resolver
//! - `inventory` - FIFO cost lots
//! - `posting` - Business events turned into balanced journal entries
//! - `restatement` - Display-currency restatement
//! - `workflow` - Refund and dividend approval chain
//! - `audit` - Transactional outbox and audit sinks
//! - `store` - Storage traits and the in-memory store

pub mod audit;
pub mod currency;
pub mod fiscal;
pub mod inventory;
pub mod ledger;
pub mod posting;
pub mod restatement;
pub mod store;
pub mod workflow;
