//! Audit sinks and the outbox relay.

use async_trait::async_trait;
use chrono::Utc;
use thiserror::Error;
use tracing::info;

use super::outbox::OutboxEvent;
use crate::store::{LedgerStore, LedgerTx, StoreError};

/// Errors raised while relaying audit events.
#[derive(Debug, Error)]
pub enum AuditError {
    /// The sink refused or failed to take the event.
    #[error("Audit delivery failed: {0}")]
    Delivery(String),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Destination for committed audit events.
#[async_trait]
pub trait AuditSink: Send + Sync + std::fmt::Debug {
    /// Takes one event. Must be idempotent on `event.id`.
    async fn deliver(&self, event: &OutboxEvent) -> Result<(), AuditError>;
}

/// Writes audit events to the `folio::audit` tracing target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn deliver(&self, event: &OutboxEvent) -> Result<(), AuditError> {
        info!(
            target: "folio::audit",
            event_id = %event.id,
            tenant_id = %event.tenant_id,
            action = %event.action,
            subject_id = %event.subject_id,
            payload = %event.payload,
            "Audit event"
        );
        Ok(())
    }
}

/// Delivers up to `limit` pending outbox events to `sink`.
///
/// Events are marked delivered in the order accepted; the first failure
/// stops the relay and the rest stay pending. Returns the number delivered.
///
/// # Errors
///
/// Returns the sink or storage error that stopped the relay.
pub async fn relay_outbox<S: LedgerStore>(
    store: &S,
    sink: &dyn AuditSink,
    limit: usize,
) -> Result<usize, AuditError> {
    let mut tx = store.begin().await?;
    let pending = tx.pending_outbox(limit).await?;

    let mut delivered = Vec::with_capacity(pending.len());
    let mut failure = None;
    for event in &pending {
        match sink.deliver(event).await {
            Ok(()) => delivered.push(event.id),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if !delivered.is_empty() {
        tx.mark_delivered(&delivered, Utc::now()).await?;
    }
    tx.commit().await?;

    match failure {
        Some(e) => Err(e),
        None => Ok(delivered.len()),
    }
}
