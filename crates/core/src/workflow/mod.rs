//! Refund and dividend approval workflow.
//!
//! - Role-gated, amount-tiered approval chain
//! - Rejection, cancellation and administrative reopen
//! - Single disbursement guard

pub mod approval;
pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod approval_props;

pub use approval::{ApprovalEngine, ApprovalTiers, can_approve, prevent_duplicate_disbursement};
pub use error::WorkflowError;
pub use service::WorkflowService;
pub use types::{Actor, ApprovalRecord, ApprovalRequest, RequestKind, RequestStatus, UserRole};
