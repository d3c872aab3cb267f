//! Audit trail through a transactional outbox.
//!
//! Events are written in the same transaction as the change they describe
//! and relayed to an [`AuditSink`] only after commit.

pub mod outbox;
pub mod sink;

pub use outbox::{AuditAction, OutboxEvent};
pub use sink::{AuditError, AuditSink, TracingAuditSink, relay_outbox};
