//! Workflow error types for the refund and dividend approval chain.

use folio_shared::types::{ApprovalRequestId, JournalEntryId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::store::StoreError;
use crate::workflow::types::{RequestStatus, UserRole};

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The request's state does not allow the action.
    #[error("Invalid approval transition from {from}: {action}")]
    InvalidApprovalTransition {
        /// Current status.
        from: RequestStatus,
        /// Attempted action.
        action: &'static str,
    },

    /// The actor does not hold the role the next stage needs.
    #[error("Role {actual} cannot act on this request, {required} required")]
    ApprovalDenied {
        /// Actor's role.
        actual: UserRole,
        /// Role of the next pending stage.
        required: UserRole,
    },

    /// The same user tried to sign off twice.
    #[error("User has already approved this request")]
    AlreadyApprovedByUser,

    /// The actor's role may not perform the action at all.
    #[error("Role {0} is not allowed to perform this action")]
    NotAuthorized(UserRole),

    /// A voucher already exists for the request.
    #[error("Request was already disbursed by entry {0}")]
    DuplicateDisbursement(JournalEntryId),

    /// Disbursement requires an approved request.
    #[error("Request is {0}, not approved")]
    NotApproved(RequestStatus),

    /// Reopen requires an approved, undisbursed request and an elevated role.
    #[error("Request cannot be reopened: {0}")]
    ReopenNotAllowed(&'static str),

    /// Request not found.
    #[error("Approval request {0} not found")]
    RequestNotFound(ApprovalRequestId),

    /// Rejection reason is required but not provided.
    #[error("Rejection reason is required")]
    RejectionReasonRequired,

    /// Amount must be positive.
    #[error("Request amount must be positive, got {0}")]
    InvalidAmount(Decimal),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::RejectionReasonRequired | Self::InvalidAmount(_) => 400,

            Self::ApprovalDenied { .. }
            | Self::AlreadyApprovedByUser
            | Self::NotAuthorized(_) => 403,

            Self::RequestNotFound(_) => 404,

            Self::InvalidApprovalTransition { .. }
            | Self::DuplicateDisbursement(_)
            | Self::NotApproved(_)
            | Self::ReopenNotAllowed(_) => 409,

            Self::Store(e) => e.http_status_code(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidApprovalTransition { .. } => "INVALID_APPROVAL_TRANSITION",
            Self::ApprovalDenied { .. } => "APPROVAL_DENIED",
            Self::AlreadyApprovedByUser => "ALREADY_APPROVED_BY_USER",
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::DuplicateDisbursement(_) => "DUPLICATE_DISBURSEMENT",
            Self::NotApproved(_) => "NOT_APPROVED",
            Self::ReopenNotAllowed(_) => "REOPEN_NOT_ALLOWED",
            Self::RequestNotFound(_) => "REQUEST_NOT_FOUND",
            Self::RejectionReasonRequired => "REJECTION_REASON_REQUIRED",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::Store(e) => e.error_code(),
        }
    }
}
