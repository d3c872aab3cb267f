//! Workflow domain types for refund and dividend approvals.
//!
//! Requests progress through these states:
//! - Pending → BranchApproved → FinanceApproved → Approved (approve)
//! - Approved → Disbursed (disburse)
//! - any non-terminal → Rejected (reject) or Cancelled (cancel)
//! - Approved → Pending (reopen, no voucher yet)

use chrono::{DateTime, Utc};
use folio_shared::types::{ApprovalRequestId, Currency, JournalEntryId, TenantId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ledger::SourceRef;

/// User role in the tenant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Read-only access.
    Viewer,
    /// Creates requests.
    Staff,
    /// Books entries and disburses.
    Accountant,
    /// First approval stage.
    BranchManager,
    /// Second approval stage.
    FinanceManager,
    /// Final approval stage.
    GeneralManager,
    /// Tenant administrator.
    Admin,
    /// Tenant owner.
    Owner,
}

impl UserRole {
    /// Parses a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "viewer" => Some(Self::Viewer),
            "staff" => Some(Self::Staff),
            "accountant" => Some(Self::Accountant),
            "branch_manager" => Some(Self::BranchManager),
            "finance_manager" => Some(Self::FinanceManager),
            "general_manager" => Some(Self::GeneralManager),
            "admin" => Some(Self::Admin),
            "owner" => Some(Self::Owner),
            _ => None,
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Staff => "staff",
            Self::Accountant => "accountant",
            Self::BranchManager => "branch_manager",
            Self::FinanceManager => "finance_manager",
            Self::GeneralManager => "general_manager",
            Self::Admin => "admin",
            Self::Owner => "owner",
        }
    }

    /// Administrative roles allowed to override the chain.
    #[must_use]
    pub const fn is_elevated(self) -> bool {
        matches!(self, Self::Admin | Self::Owner)
    }

    /// Roles allowed to release approved money.
    #[must_use]
    pub const fn can_disburse(self) -> bool {
        matches!(
            self,
            Self::Accountant
                | Self::FinanceManager
                | Self::GeneralManager
                | Self::Admin
                | Self::Owner
        )
    }

    /// Roles allowed to manage the period calendar and restate amounts.
    #[must_use]
    pub const fn can_keep_books(self) -> bool {
        self.can_disburse()
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The caller of an operation, as established by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Tenant the caller acts for.
    pub tenant_id: TenantId,
    /// The user.
    pub user_id: UserId,
    /// The user's role in the tenant.
    pub role: UserRole,
}

impl Actor {
    /// Creates an actor.
    #[must_use]
    pub const fn new(tenant_id: TenantId, user_id: UserId, role: UserRole) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
        }
    }
}

/// What the request pays out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    /// Refund to a customer.
    Refund,
    /// Dividend to shareholders.
    Dividend,
}

impl RequestKind {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Refund => "refund",
            Self::Dividend => "dividend",
        }
    }

    /// Parses a kind from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "refund" => Some(Self::Refund),
            "dividend" => Some(Self::Dividend),
            _ => None,
        }
    }
}

/// Request status in the approval chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    /// Waiting for the first approval.
    Pending,
    /// Branch manager approved.
    BranchApproved,
    /// Finance manager approved.
    FinanceApproved,
    /// Every required approver signed off.
    Approved,
    /// Money was released.
    Disbursed,
    /// Turned down.
    Rejected,
    /// Withdrawn.
    Cancelled,
}

impl RequestStatus {
    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::BranchApproved => "branch_approved",
            Self::FinanceApproved => "finance_approved",
            Self::Approved => "approved",
            Self::Disbursed => "disbursed",
            Self::Rejected => "rejected",
            Self::Cancelled => "cancelled",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "branch_approved" => Some(Self::BranchApproved),
            "finance_approved" => Some(Self::FinanceApproved),
            "approved" => Some(Self::Approved),
            "disbursed" => Some(Self::Disbursed),
            "rejected" => Some(Self::Rejected),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// No further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Disbursed | Self::Rejected | Self::Cancelled)
    }

    /// Number of approval stages already completed, `None` outside the chain.
    #[must_use]
    pub const fn completed_stages(self) -> Option<usize> {
        match self {
            Self::Pending => Some(0),
            Self::BranchApproved => Some(1),
            Self::FinanceApproved => Some(2),
            _ => None,
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sign-off in the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Stage role that was satisfied.
    pub stage: UserRole,
    /// Approving user.
    pub user_id: UserId,
    /// When it happened.
    pub approved_at: DateTime<Utc>,
}

/// A refund or dividend awaiting approval and disbursement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique identifier.
    pub id: ApprovalRequestId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Refund or dividend.
    pub kind: RequestKind,
    /// Amount to pay out.
    pub amount: Decimal,
    /// Currency of the amount.
    pub currency: Currency,
    /// Document the request relates to, e.g. the returned invoice.
    pub source_document: Option<SourceRef>,
    /// Current status.
    pub status: RequestStatus,
    /// Approval stages, fixed at creation.
    pub required_approvers: Vec<UserRole>,
    /// Sign-offs so far, in order.
    pub approvals: Vec<ApprovalRecord>,
    /// Entry that paid the request out.
    pub disbursement_voucher: Option<JournalEntryId>,
    /// Why it was rejected.
    pub rejection_reason: Option<String>,
    /// Requesting user.
    pub created_by: UserId,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last change.
    pub updated_at: DateTime<Utc>,
}
