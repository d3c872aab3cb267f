//! Posting engine error types.

use folio_shared::types::TenantId;
use thiserror::Error;
use uuid::Uuid;

use crate::currency::CurrencyError;
use crate::fiscal::FiscalError;
use crate::inventory::InventoryError;
use crate::ledger::{AccountSubtype, LedgerError};
use crate::store::StoreError;
use crate::workflow::{UserRole, WorkflowError};

/// Errors raised by engine operations.
///
/// A failed operation leaves no trace in storage.
#[derive(Debug, Error)]
pub enum PostingError {
    /// The event is missing a field or carries an impossible value.
    #[error("Invalid {event_type} event: {reason}")]
    InvalidEvent {
        /// Event type.
        event_type: &'static str,
        /// What is wrong.
        reason: String,
    },

    /// The tenant has no active account for a template slot.
    #[error("No active {subtype} account configured")]
    AccountNotConfigured {
        /// Missing subtype.
        subtype: AccountSubtype,
    },

    /// Tenant not found.
    #[error("Tenant not found: {0}")]
    TenantNotFound(TenantId),

    /// The actor belongs to another tenant.
    #[error("Actor of tenant {actor_tenant} cannot act for tenant {tenant}")]
    TenantMismatch {
        /// Tenant of the actor.
        actor_tenant: TenantId,
        /// Tenant addressed.
        tenant: TenantId,
    },

    /// The actor's role may not perform the action.
    #[error("Role {role} may not {action}")]
    Forbidden {
        /// Actor role.
        role: UserRole,
        /// Attempted action.
        action: &'static str,
    },

    /// An invoice cannot be reversed while a return is booked against it.
    #[error("Invoice {invoice_id} still has return {return_id} booked against it")]
    ReturnsOutstanding {
        /// Invoice being reversed.
        invoice_id: Uuid,
        /// A live return against it.
        return_id: Uuid,
    },

    /// Ledger rule violated.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Period calendar rule violated.
    #[error(transparent)]
    Fiscal(#[from] FiscalError),

    /// Rate resolution or conversion failed.
    #[error(transparent)]
    Currency(#[from] CurrencyError),

    /// Cost lot rule violated.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Approval rule violated.
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEvent { .. } => "INVALID_EVENT",
            Self::AccountNotConfigured { .. } => "ACCOUNT_NOT_CONFIGURED",
            Self::TenantNotFound(_) => "TENANT_NOT_FOUND",
            Self::TenantMismatch { .. } => "TENANT_MISMATCH",
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::ReturnsOutstanding { .. } => "RETURNS_OUTSTANDING",
            Self::Ledger(e) => e.error_code(),
            Self::Fiscal(e) => e.error_code(),
            Self::Currency(e) => e.error_code(),
            Self::Inventory(e) => e.error_code(),
            Self::Workflow(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidEvent { .. } => 400,
            Self::AccountNotConfigured { .. } => 422,
            Self::TenantNotFound(_) => 404,
            Self::TenantMismatch { .. } | Self::Forbidden { .. } => 403,
            Self::ReturnsOutstanding { .. } => 409,
            Self::Ledger(e) => e.http_status_code(),
            Self::Fiscal(e) => e.http_status_code(),
            Self::Currency(e) => e.http_status_code(),
            Self::Inventory(e) => e.http_status_code(),
            Self::Workflow(e) => e.http_status_code(),
            Self::Store(e) => e.http_status_code(),
        }
    }

    /// Returns true if the operation may succeed when retried.
    ///
    /// Only a lost race on the document reference qualifies; the retry then
    /// finds the winner's entry and amends it.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(e) => e.is_retryable(),
            Self::Currency(CurrencyError::Store(e))
            | Self::Inventory(InventoryError::Store(e))
            | Self::Workflow(WorkflowError::Store(e))
            | Self::Store(e) => e.is_retryable(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_variants() {
        let err = PostingError::AccountNotConfigured {
            subtype: AccountSubtype::VatPayable,
        };
        assert_eq!(err.error_code(), "ACCOUNT_NOT_CONFIGURED");
        assert_eq!(err.http_status_code(), 422);
        assert_eq!(err.to_string(), "No active vat_payable account configured");

        let err = PostingError::InvalidEvent {
            event_type: "invoice",
            reason: "amount must be positive".into(),
        };
        assert_eq!(err.to_string(), "Invalid invoice event: amount must be positive");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_wrapped_errors_keep_their_codes() {
        let err: PostingError = LedgerError::InsufficientLines.into();
        assert_eq!(err.error_code(), "INSUFFICIENT_LINES");
        assert_eq!(err.http_status_code(), 400);

        let err: PostingError = LedgerError::Store(StoreError::Conflict("dup".into())).into();
        assert!(err.is_retryable());

        let err: PostingError = InventoryError::Store(StoreError::Conflict("dup".into())).into();
        assert!(err.is_retryable());
        assert_eq!(err.http_status_code(), 409);
    }
}
