//! Shared fixtures for engine tests against the in-memory store.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::NaiveDate;
use folio_core::fiscal::AccountingPeriod;
use folio_core::ledger::{Account, AccountSubtype, JournalLine, TenantProfile};
use folio_core::posting::{BusinessEvent, LineItem, PostingEngine};
use folio_core::store::MemoryStore;
use folio_core::workflow::{Actor, UserRole};
use folio_shared::FolioConfig;
use folio_shared::types::{
    AccountId, Currency, JournalEntryId, PeriodId, ProductId, TenantId, UserId,
};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A tenant with a full chart and one open period, March 2026.
pub struct Books {
    pub engine: PostingEngine<MemoryStore>,
    pub store: MemoryStore,
    pub tenant: TenantId,
    pub actor: Actor,
    pub period: PeriodId,
    pub chart: HashMap<AccountSubtype, AccountId>,
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
}

pub async fn books(base: Currency) -> Books {
    books_with(base, FolioConfig::default()).await
}

pub async fn books_with(base: Currency, config: FolioConfig) -> Books {
    let store = MemoryStore::new();
    let profile = TenantProfile::new("Acme Trading", base);
    let tenant = profile.tenant_id;
    store.add_tenant(profile).await;

    let mut chart = HashMap::new();
    for (i, subtype) in AccountSubtype::ALL.into_iter().enumerate() {
        let code = format!("{}", 1000 + i * 10);
        let account = Account::for_subtype(tenant, code, subtype.as_str(), subtype);
        chart.insert(subtype, account.id);
        store.add_account(account).await;
    }

    let period = AccountingPeriod::new(tenant, "March 2026", date(1), date(31));
    let period_id = period.id;
    store.add_period(period).await;

    Books {
        engine: PostingEngine::new(store.clone(), &config),
        store,
        tenant,
        actor: Actor::new(tenant, UserId::new(), UserRole::Accountant),
        period: period_id,
        chart,
    }
}

impl Books {
    pub fn account(&self, subtype: AccountSubtype) -> AccountId {
        self.chart[&subtype]
    }

    pub fn as_role(&self, role: UserRole) -> Actor {
        Actor::new(self.tenant, UserId::new(), role)
    }

    pub async fn lines(&self, entry: JournalEntryId) -> Vec<JournalLine> {
        self.store.snapshot().await.lines.get(&entry).cloned().unwrap_or_default()
    }

    /// Net debit minus credit posted to `subtype` across all entries.
    pub async fn net(&self, subtype: AccountSubtype) -> Decimal {
        let account = self.account(subtype);
        self.store
            .snapshot()
            .await
            .tenant_lines(self.tenant)
            .filter(|l| l.account_id == account)
            .map(|l| l.debit - l.credit)
            .sum()
    }
}

pub fn invoice(currency: Currency, subtotal: Decimal, tax: Decimal) -> BusinessEvent {
    BusinessEvent::Invoice {
        id: Uuid::new_v4(),
        currency,
        subtotal,
        tax,
        items: vec![],
    }
}

pub fn stocked_invoice(subtotal: Decimal, product: ProductId, quantity: Decimal) -> BusinessEvent {
    BusinessEvent::Invoice {
        id: Uuid::new_v4(),
        currency: Currency::USD,
        subtotal,
        tax: Decimal::ZERO,
        items: vec![LineItem {
            product_id: product,
            quantity,
        }],
    }
}

pub fn debit_total(lines: &[JournalLine]) -> Decimal {
    lines.iter().map(|l| l.debit).sum()
}

pub fn credit_total(lines: &[JournalLine]) -> Decimal {
    lines.iter().map(|l| l.credit).sum()
}
