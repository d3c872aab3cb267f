//! Posting engine tests: templates, balance, idempotency and the period guard.

mod common;

use common::{Books, books, credit_total, date, debit_total, invoice};
use folio_core::currency::{ExchangeRate, RateSource};
use folio_core::fiscal::{AccountingPeriod, PeriodClassification};
use folio_core::ledger::{
    Account, AccountSubtype, LedgerError, ReferenceType, SourceRef, TenantProfile,
};
use folio_core::posting::{BusinessEvent, PostingError};
use folio_core::workflow::{Actor, UserRole};
use folio_shared::types::{Currency, TenantId, UserId};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

async fn add_eur_usd(books: &Books, rate: Decimal) {
    books
        .store
        .add_rate(ExchangeRate::new(
            None,
            Currency::EUR,
            Currency::USD,
            rate,
            date(1),
            RateSource::Manual,
        ))
        .await;
}

// ============================================================================
// Templates and conversion
// ============================================================================

#[tokio::test]
async fn test_foreign_invoice_converted_per_side() {
    let books = books(Currency::USD).await;
    add_eur_usd(&books, dec!(2.0)).await;

    let event = invoice(Currency::EUR, dec!(900), dec!(100));
    let outcome = books.engine.post(&event, date(10), books.tenant, &books.actor).await.unwrap();
    assert!(outcome.created);

    let lines = books.lines(outcome.entry_id).await;
    assert_eq!(lines.len(), 3);
    assert_eq!(debit_total(&lines), dec!(2000));
    assert_eq!(credit_total(&lines), dec!(2000));

    let receivable = &lines[0];
    assert_eq!(receivable.account_id, books.account(AccountSubtype::AccountsReceivable));
    let original = receivable.original.unwrap();
    assert_eq!(original.currency, Currency::EUR);
    assert_eq!(original.amount, dec!(1000));
    assert_eq!(original.rate, dec!(2.0));
    assert_eq!(lines[1].credit, dec!(1800));
    assert_eq!(lines[2].credit, dec!(200));
}

#[tokio::test]
async fn test_rounding_never_unbalances() {
    let books = books(Currency::USD).await;
    add_eur_usd(&books, dec!(1.0837)).await;

    for (subtotal, tax) in [
        (dec!(10.01), dec!(1.1)),
        (dec!(333.33), dec!(36.67)),
        (dec!(0.07), dec!(0.01)),
    ] {
        let outcome = books
            .engine
            .post(&invoice(Currency::EUR, subtotal, tax), date(5), books.tenant, &books.actor)
            .await
            .unwrap();
        let lines = books.lines(outcome.entry_id).await;
        assert_eq!(debit_total(&lines), credit_total(&lines), "{subtotal} + {tax}");
    }

    let trial = books.engine.trial_balance(books.tenant).await.unwrap();
    assert!(trial.is_balanced());
}

#[tokio::test]
async fn test_every_event_type_posts_balanced() {
    let books = books(Currency::USD).await;
    let usd = Currency::USD;
    let events = [
        invoice(usd, dec!(1000), dec!(110)),
        BusinessEvent::InvoicePayment {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            currency: usd,
            amount: dec!(1110),
            deposit_account_id: None,
        },
        BusinessEvent::Bill {
            id: Uuid::new_v4(),
            currency: usd,
            subtotal: dec!(400),
            tax: dec!(44),
            expense_account_id: None,
        },
        BusinessEvent::BillPayment {
            id: Uuid::new_v4(),
            bill_id: Uuid::new_v4(),
            currency: usd,
            amount: dec!(444),
            payment_account_id: None,
        },
        BusinessEvent::PayrollRun {
            id: Uuid::new_v4(),
            currency: usd,
            gross_pay: dec!(5000),
            withholdings: dec!(750),
            employer_contributions: dec!(400),
        },
        BusinessEvent::DividendDistribution {
            id: Uuid::new_v4(),
            currency: usd,
            amount: dec!(300),
        },
        BusinessEvent::OwnerDrawing {
            id: Uuid::new_v4(),
            currency: usd,
            amount: dec!(120),
        },
        BusinessEvent::RefundDisbursement {
            id: Uuid::new_v4(),
            currency: usd,
            amount: dec!(50),
        },
        BusinessEvent::SalesReturn {
            id: Uuid::new_v4(),
            invoice_id: Uuid::new_v4(),
            currency: usd,
            returned_subtotal: dec!(100),
            invoice_subtotal: dec!(1000),
            invoice_tax: dec!(110),
            original_tax_rate: None,
            items: vec![],
        },
    ];

    for event in &events {
        let outcome = books.engine.post(event, date(12), books.tenant, &books.actor).await.unwrap();
        let lines = books.lines(outcome.entry_id).await;
        assert!(lines.len() >= 2, "{}", event.event_type());
        assert_eq!(debit_total(&lines), credit_total(&lines), "{}", event.event_type());
    }

    let state = books.store.snapshot().await;
    assert_eq!(state.entries.len(), events.len());
    assert_eq!(
        books.net(AccountSubtype::Cash).await,
        dec!(1110) - dec!(444) - dec!(4250) - dec!(300) - dec!(120) - dec!(50)
    );
    assert_eq!(books.net(AccountSubtype::VatPayable).await, dec!(-110) + dec!(11));
}

#[tokio::test]
async fn test_explicit_deposit_account_used() {
    let books = books(Currency::USD).await;
    let bank = books.account(AccountSubtype::Cash);
    let event = BusinessEvent::InvoicePayment {
        id: Uuid::new_v4(),
        invoice_id: Uuid::new_v4(),
        currency: Currency::USD,
        amount: dec!(75),
        deposit_account_id: Some(bank),
    };
    let outcome = books.engine.post(&event, date(3), books.tenant, &books.actor).await.unwrap();
    assert_eq!(books.lines(outcome.entry_id).await[0].account_id, bank);
}

// ============================================================================
// Idempotency
// ============================================================================

#[tokio::test]
async fn test_repost_is_idempotent() {
    let books = books(Currency::USD).await;
    add_eur_usd(&books, dec!(1.1)).await;
    let event = invoice(Currency::EUR, dec!(500), dec!(55));

    let first = books.engine.post(&event, date(10), books.tenant, &books.actor).await.unwrap();
    let lines_before = books.lines(first.entry_id).await;

    let second = books.engine.post(&event, date(10), books.tenant, &books.actor).await.unwrap();
    assert_eq!(second.entry_id, first.entry_id);
    assert!(!second.created);
    assert!(!second.amended);
    assert_eq!(books.lines(first.entry_id).await, lines_before);

    let state = books.store.snapshot().await;
    assert_eq!(state.entries.len(), 1);
    let reference = SourceRef::new(ReferenceType::Invoice, event.source_id());
    assert_eq!(state.document_links.get(&(books.tenant, reference)), Some(&first.entry_id));
}

#[tokio::test]
async fn test_repost_with_new_amounts_amends_in_place() {
    let books = books(Currency::USD).await;
    let id = Uuid::new_v4();
    let original = BusinessEvent::OwnerDrawing {
        id,
        currency: Currency::USD,
        amount: dec!(100),
    };
    let changed = BusinessEvent::OwnerDrawing {
        id,
        currency: Currency::USD,
        amount: dec!(140),
    };

    let first = books.engine.post(&original, date(4), books.tenant, &books.actor).await.unwrap();
    let line_ids: Vec<_> = books.lines(first.entry_id).await.iter().map(|l| l.id).collect();

    let second = books.engine.post(&changed, date(6), books.tenant, &books.actor).await.unwrap();
    assert_eq!(second.entry_id, first.entry_id);
    assert!(second.amended);

    let lines = books.lines(first.entry_id).await;
    assert_eq!(lines.iter().map(|l| l.id).collect::<Vec<_>>(), line_ids);
    assert_eq!(debit_total(&lines), dec!(140));

    let state = books.store.snapshot().await;
    assert_eq!(state.entries.len(), 1);
    assert_eq!(state.entries[0].entry_date, date(6));
}

#[tokio::test]
async fn test_reversed_entry_is_not_amended() {
    let books = books(Currency::USD).await;
    let event = invoice(Currency::USD, dec!(80), dec!(0));
    let first = books.engine.post(&event, date(2), books.tenant, &books.actor).await.unwrap();
    books.engine.reverse(&books.actor, first.entry_id, date(3), "wrong customer").await.unwrap();

    let err = books.engine.post(&event, date(2), books.tenant, &books.actor).await.unwrap_err();
    assert!(matches!(err, PostingError::Ledger(LedgerError::AlreadyReversed(_))));

    let trial = books.engine.trial_balance(books.tenant).await.unwrap();
    assert!(trial.is_balanced());
    assert_eq!(books.net(AccountSubtype::AccountsReceivable).await, Decimal::ZERO);
}

// ============================================================================
// Period guard
// ============================================================================

#[tokio::test]
async fn test_closed_period_rejects_without_side_effects() {
    let books = books(Currency::USD).await;
    books.engine.close_period(&books.actor, books.period).await.unwrap();
    assert_eq!(
        books.engine.classify(books.tenant, date(15)).await.unwrap(),
        PeriodClassification::Closed(books.period)
    );

    let before = books.store.snapshot().await;
    let err = books
        .engine
        .post(&invoice(Currency::USD, dec!(10), dec!(1)), date(15), books.tenant, &books.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, PostingError::Ledger(LedgerError::PeriodClosed { .. })));
    assert_eq!(err.error_code(), "PERIOD_CLOSED");

    let after = books.store.snapshot().await;
    assert_eq!(before, after);
    assert!(after.entries.is_empty());
}

#[tokio::test]
async fn test_date_outside_calendar_rejected() {
    let books = books(Currency::USD).await;
    let april = chrono::NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
    let err = books
        .engine
        .post(&invoice(Currency::USD, dec!(10), dec!(0)), april, books.tenant, &books.actor)
        .await
        .unwrap_err();
    assert!(matches!(err, PostingError::Ledger(LedgerError::NoPeriodDefined(_))));
}

#[tokio::test]
async fn test_locking_needs_elevated_role() {
    let books = books(Currency::USD).await;
    books.engine.close_period(&books.actor, books.period).await.unwrap();

    let err = books.engine.lock_period(&books.actor, books.period).await.unwrap_err();
    assert!(matches!(err, PostingError::Forbidden { .. }));

    books
        .engine
        .lock_period(&books.as_role(UserRole::Owner), books.period)
        .await
        .unwrap();
    assert_eq!(
        books.engine.classify(books.tenant, date(1)).await.unwrap(),
        PeriodClassification::Locked(books.period)
    );
}

#[tokio::test]
async fn test_define_period_extends_calendar() {
    let books = books(Currency::USD).await;
    let april_start = chrono::NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
    let april_end = chrono::NaiveDate::from_ymd_opt(2026, 4, 30).unwrap();

    let april = books
        .engine
        .define_period(&books.actor, "April 2026", april_start, april_end)
        .await
        .unwrap();
    assert_eq!(
        books.engine.classify(books.tenant, april_start).await.unwrap(),
        PeriodClassification::Open(april.id)
    );

    let gap = books
        .engine
        .define_period(
            &books.actor,
            "June 2026",
            chrono::NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(),
            chrono::NaiveDate::from_ymd_opt(2026, 6, 30).unwrap(),
        )
        .await;
    assert!(matches!(gap, Err(PostingError::Fiscal(_))));
}

#[tokio::test]
async fn test_empty_calendar_rejects_postings() {
    let books = books(Currency::USD).await;
    let stranger = TenantId::new();
    let actor = Actor::new(stranger, UserId::new(), UserRole::Accountant);
    books
        .store
        .add_tenant(TenantProfile {
            tenant_id: stranger,
            name: "No calendar".into(),
            base_currency: Currency::USD,
        })
        .await;

    assert_eq!(
        books.engine.classify(stranger, date(1)).await.unwrap(),
        PeriodClassification::NoPeriodDefined
    );
    let err = books
        .engine
        .post(&invoice(Currency::USD, dec!(1), dec!(0)), date(1), stranger, &actor)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "NO_PERIOD_DEFINED");
}

// ============================================================================
// Rejections
// ============================================================================

#[tokio::test]
async fn test_missing_chart_account_reported() {
    let books = books(Currency::USD).await;
    let profile = TenantProfile::new("Thin chart", Currency::USD);
    let tenant = profile.tenant_id;
    books.store.add_tenant(profile).await;
    books
        .store
        .add_period(AccountingPeriod::new(tenant, "March 2026", date(1), date(31)))
        .await;
    for subtype in [
        AccountSubtype::Cash,
        AccountSubtype::SalaryExpense,
        AccountSubtype::PayrollLiabilities,
    ] {
        books
            .store
            .add_account(Account::for_subtype(tenant, subtype.as_str(), subtype.as_str(), subtype))
            .await;
    }

    let actor = Actor::new(tenant, UserId::new(), UserRole::Accountant);
    let err = books
        .engine
        .post(
            &BusinessEvent::PayrollRun {
                id: Uuid::new_v4(),
                currency: Currency::USD,
                gross_pay: dec!(100),
                withholdings: dec!(0),
                employer_contributions: dec!(10),
            },
            date(5),
            tenant,
            &actor,
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        PostingError::AccountNotConfigured {
            subtype: AccountSubtype::PayrollTaxExpense
        }
    ));

    let unknown = TenantId::new();
    let err = books
        .engine
        .post(
            &invoice(Currency::USD, dec!(1), dec!(0)),
            date(5),
            unknown,
            &Actor::new(unknown, UserId::new(), UserRole::Accountant),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, PostingError::TenantNotFound(_)));
}

#[tokio::test]
async fn test_actor_of_other_tenant_rejected() {
    let books = books(Currency::USD).await;
    let outsider = Actor::new(TenantId::new(), UserId::new(), UserRole::Owner);
    let err = books
        .engine
        .post(&invoice(Currency::USD, dec!(1), dec!(0)), date(1), books.tenant, &outsider)
        .await
        .unwrap_err();
    assert!(matches!(err, PostingError::TenantMismatch { .. }));
    assert_eq!(err.http_status_code(), 403);
}

#[tokio::test]
async fn test_viewer_cannot_post() {
    let books = books(Currency::USD).await;
    let err = books
        .engine
        .post(
            &invoice(Currency::USD, dec!(1), dec!(0)),
            date(1),
            books.tenant,
            &books.as_role(UserRole::Viewer),
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "FORBIDDEN");
}

#[tokio::test]
async fn test_invalid_event_rejected_before_storage() {
    let books = books(Currency::USD).await;
    let before = books.store.snapshot().await;
    let err = books
        .engine
        .post(
            &BusinessEvent::DividendDistribution {
                id: Uuid::new_v4(),
                currency: Currency::USD,
                amount: dec!(0),
            },
            date(1),
            books.tenant,
            &books.actor,
        )
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "INVALID_EVENT");
    assert_eq!(books.store.snapshot().await, before);
}
