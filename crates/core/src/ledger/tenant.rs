//! Tenant settings the ledger depends on.

use folio_shared::types::{Currency, TenantId};
use serde::{Deserialize, Serialize};

/// Per-tenant ledger settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    /// The tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Functional currency all journal amounts are kept in.
    pub base_currency: Currency,
}

impl TenantProfile {
    /// Creates a profile with a fresh tenant id.
    #[must_use]
    pub fn new(name: impl Into<String>, base_currency: Currency) -> Self {
        Self {
            tenant_id: TenantId::new(),
            name: name.into(),
            base_currency,
        }
    }
}
