//! Display-currency restatement and reset over a tenant's amount records.

mod common;

use common::{Books, books, date, invoice};
use folio_core::restatement::{AmountRecord, RecordKey, RecordKind};
use folio_core::store::MemoryState;
use folio_core::workflow::UserRole;
use folio_shared::types::{Currency, Money};
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn with_documents(books: &Books) {
    books
        .engine
        .post(&invoice(Currency::USD, dec!(100), dec!(10)), date(4), books.tenant, &books.actor)
        .await
        .unwrap();
    for (kind, amount) in [
        (RecordKind::Invoice, dec!(110)),
        (RecordKind::ProductPrice, dec!(12.35)),
    ] {
        books
            .store
            .add_document(AmountRecord {
                key: RecordKey::new(kind, Uuid::new_v4()),
                tenant_id: books.tenant,
                original: Money::new(amount, Currency::USD),
                display: None,
            })
            .await;
    }
}

/// State without the audit outbox, which every operation appends to.
fn books_only(mut state: MemoryState) -> MemoryState {
    state.outbox.clear();
    state
}

#[tokio::test]
async fn test_restate_writes_display_amounts_only() {
    let books = books(Currency::USD).await;
    with_documents(&books).await;
    let before = books.store.snapshot().await;

    let summary = books.engine.restate(&books.actor, Currency::EUR, dec!(0.5)).await.unwrap();
    assert_eq!(summary.count(RecordKind::Invoice), 1);
    assert_eq!(summary.count(RecordKind::ProductPrice), 1);
    assert_eq!(summary.count(RecordKind::JournalLine), 3);
    assert_eq!(summary.total(), 5);

    let after = books.store.snapshot().await;
    for (entry, lines) in &after.lines {
        for (line, old) in lines.iter().zip(&before.lines[entry]) {
            assert_eq!(line.debit, old.debit);
            assert_eq!(line.credit, old.credit);
            assert_eq!(line.original, old.original);
            let display = line.display.unwrap();
            assert_eq!(display.currency, Currency::EUR);
            assert_eq!(display.amount, (line.debit + line.credit) * dec!(0.5));
        }
    }

    let price = after
        .documents
        .iter()
        .find(|d| d.key.kind == RecordKind::ProductPrice)
        .unwrap();
    assert_eq!(price.original, Money::new(dec!(12.35), Currency::USD));
    // 6.175 rounds half up
    assert_eq!(price.display.unwrap().amount, dec!(6.18));
}

#[tokio::test]
async fn test_reset_restores_the_unrestated_state() {
    let books = books(Currency::USD).await;
    with_documents(&books).await;
    let before = books_only(books.store.snapshot().await);

    books.engine.restate(&books.actor, Currency::EUR, dec!(0.5)).await.unwrap();
    books.engine.restate(&books.actor, Currency::IDR, dec!(16250)).await.unwrap();
    let summary = books.engine.reset_restatement(&books.actor).await.unwrap();
    assert_eq!(summary.total(), 5);

    assert_eq!(books_only(books.store.snapshot().await), before);

    let again = books.engine.reset_restatement(&books.actor).await.unwrap();
    assert_eq!(again.total(), 0);
}

#[tokio::test]
async fn test_invalid_rate_changes_nothing() {
    let books = books(Currency::USD).await;
    with_documents(&books).await;
    let before = books.store.snapshot().await;

    let err = books
        .engine
        .restate(&books.actor, Currency::EUR, dec!(0))
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_RATE");
    assert_eq!(books.store.snapshot().await, before);
}

#[tokio::test]
async fn test_staff_cannot_restate() {
    let books = books(Currency::USD).await;
    let staff = books.as_role(UserRole::Staff);

    let err = books.engine.restate(&staff, Currency::EUR, dec!(0.5)).await.unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
    let err = books.engine.reset_restatement(&staff).await.unwrap_err();
    assert_eq!(err.http_status_code(), 403);
}
