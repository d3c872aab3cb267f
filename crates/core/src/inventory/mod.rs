//! FIFO inventory costing.
//!
//! - Cost lots and consumption records
//! - Oldest-first draws, restores and weighted cost
//! - Stock count reconciliation
//! - Transactional service over the lot store

pub mod allocator;
pub mod error;
pub mod lot;
pub mod reconcile;
pub mod service;

#[cfg(test)]
mod allocator_props;

pub use allocator::{available_quantity, consume, restore, weighted_unit_cost};
pub use error::InventoryError;
pub use lot::{Consumption, CostLot, LotConsumption, LotSlice, LotSource};
pub use reconcile::{ReconcileAction, Reconciliation, reconcile};
pub use service::InventoryService;
