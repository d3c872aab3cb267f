//! Audit outbox: events commit with their operation and are relayed after.

mod common;

use std::sync::Arc;

use async_trait::async_trait;
use common::{books, date, invoice};
use folio_core::audit::{AuditAction, AuditError, AuditSink, OutboxEvent, relay_outbox};
use folio_shared::types::Currency;
use rust_decimal_macros::dec;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct RecordingSink {
    seen: Mutex<Vec<AuditAction>>,
}

#[async_trait]
impl AuditSink for RecordingSink {
    async fn deliver(&self, event: &OutboxEvent) -> Result<(), AuditError> {
        self.seen.lock().await.push(event.action);
        Ok(())
    }
}

#[derive(Debug)]
struct DownSink;

#[async_trait]
impl AuditSink for DownSink {
    async fn deliver(&self, _event: &OutboxEvent) -> Result<(), AuditError> {
        Err(AuditError::Delivery("collector unreachable".to_string()))
    }
}

#[tokio::test]
async fn test_posting_relays_its_audit_event() {
    let books = books(Currency::USD).await;
    let sink = Arc::new(RecordingSink::default());
    let engine = books.engine.with_audit_sink(sink.clone());

    let event = invoice(Currency::USD, dec!(100), dec!(10));
    let outcome = engine.post(&event, date(3), books.tenant, &books.actor).await.unwrap();

    assert_eq!(*sink.seen.lock().await, vec![AuditAction::EntryPosted]);
    let outbox = books.store.snapshot().await.outbox;
    assert_eq!(outbox.len(), 1);
    assert_eq!(outbox[0].subject_id, outcome.entry_id.into_inner());
    assert_eq!(outbox[0].actor, Some(books.actor.user_id));
    assert!(outbox[0].delivered_at.is_some());

    // An unchanged repost writes no audit event.
    engine.post(&event, date(3), books.tenant, &books.actor).await.unwrap();
    assert_eq!(books.store.snapshot().await.outbox.len(), 1);
}

#[tokio::test]
async fn test_sink_outage_keeps_events_pending() {
    let books = books(Currency::USD).await;
    let engine = books.engine.with_audit_sink(Arc::new(DownSink));

    let outcome = engine
        .post(&invoice(Currency::USD, dec!(50), dec!(5)), date(3), books.tenant, &books.actor)
        .await
        .unwrap();

    let state = books.store.snapshot().await;
    assert!(state.entries.iter().any(|e| e.id == outcome.entry_id));
    assert_eq!(state.outbox.len(), 1);
    assert!(state.outbox[0].delivered_at.is_none());

    // Once the collector is back the pending event goes out.
    let sink = RecordingSink::default();
    let delivered = relay_outbox(&books.store, &sink, 10).await.unwrap();
    assert_eq!(delivered, 1);
    assert!(books.store.snapshot().await.outbox[0].delivered_at.is_some());
    assert_eq!(relay_outbox(&books.store, &sink, 10).await.unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_operation_writes_no_audit_event() {
    let books = books(Currency::USD).await;

    let april = chrono::NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
    books
        .engine
        .post(&invoice(Currency::USD, dec!(50), dec!(5)), april, books.tenant, &books.actor)
        .await
        .unwrap_err();
    assert!(books.store.snapshot().await.outbox.is_empty());
}
