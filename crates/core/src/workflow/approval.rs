//! Approval chain rules for refund and dividend requests.
//!
//! Every function here is pure: it checks and mutates an in-memory request.
//! Persistence happens in [`super::service`].

use chrono::{DateTime, Utc};
use folio_shared::config::ApprovalConfig;
use folio_shared::types::JournalEntryId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Actor, ApprovalRecord, ApprovalRequest, RequestStatus, UserRole};

/// Amount thresholds that decide how many stages a request needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalTiers {
    /// Up to this amount only the branch manager signs.
    pub branch_limit: Decimal,
    /// Up to this amount the finance manager signs too.
    pub finance_limit: Decimal,
}

impl Default for ApprovalTiers {
    fn default() -> Self {
        Self::from(&ApprovalConfig::default())
    }
}

impl From<&ApprovalConfig> for ApprovalTiers {
    fn from(config: &ApprovalConfig) -> Self {
        Self {
            branch_limit: config.branch_limit,
            finance_limit: config.finance_limit,
        }
    }
}

impl ApprovalTiers {
    /// Stages required for `amount`, in signing order.
    #[must_use]
    pub fn required_approvers(&self, amount: Decimal) -> Vec<UserRole> {
        if amount <= self.branch_limit {
            vec![UserRole::BranchManager]
        } else if amount <= self.finance_limit {
            vec![UserRole::BranchManager, UserRole::FinanceManager]
        } else {
            vec![
                UserRole::BranchManager,
                UserRole::FinanceManager,
                UserRole::GeneralManager,
            ]
        }
    }
}

/// Decides the status after `role` signs a request in `current` needing `required`.
///
/// The actor must hold exactly the role of the next pending stage.
///
/// # Errors
///
/// Returns `InvalidApprovalTransition` outside the chain and `ApprovalDenied`
/// for the wrong role.
pub fn can_approve(
    role: UserRole,
    current: RequestStatus,
    required: &[UserRole],
) -> Result<RequestStatus, WorkflowError> {
    let invalid = || WorkflowError::InvalidApprovalTransition {
        from: current,
        action: "approve",
    };

    let completed = current.completed_stages().ok_or_else(invalid)?;
    let Some(&next) = required.get(completed) else {
        return Err(invalid());
    };

    if role != next {
        return Err(WorkflowError::ApprovalDenied {
            actual: role,
            required: next,
        });
    }

    Ok(match completed + 1 {
        n if n == required.len() => RequestStatus::Approved,
        1 => RequestStatus::BranchApproved,
        _ => RequestStatus::FinanceApproved,
    })
}

/// Checks that a request may be paid out now.
///
/// # Errors
///
/// Returns `DuplicateDisbursement` when a voucher exists and `NotApproved`
/// when the request is not approved.
pub fn prevent_duplicate_disbursement(request: &ApprovalRequest) -> Result<(), WorkflowError> {
    if let Some(voucher) = request.disbursement_voucher {
        return Err(WorkflowError::DuplicateDisbursement(voucher));
    }
    if request.status != RequestStatus::Approved {
        return Err(WorkflowError::NotApproved(request.status));
    }
    Ok(())
}

/// Stateless engine applying workflow actions to a request.
pub struct ApprovalEngine;

impl ApprovalEngine {
    /// Records `actor`'s sign-off.
    ///
    /// # Errors
    ///
    /// See [`can_approve`]; also `AlreadyApprovedByUser`.
    pub fn approve(
        request: &mut ApprovalRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<RequestStatus, WorkflowError> {
        if request.approvals.iter().any(|a| a.user_id == actor.user_id) {
            return Err(WorkflowError::AlreadyApprovedByUser);
        }

        let next = can_approve(actor.role, request.status, &request.required_approvers)?;
        request.approvals.push(ApprovalRecord {
            stage: actor.role,
            user_id: actor.user_id,
            approved_at: now,
        });
        request.status = next;
        request.updated_at = now;
        Ok(next)
    }

    /// Turns a request down.
    ///
    /// The next stage's approver or an elevated role may reject.
    ///
    /// # Errors
    ///
    /// Returns `RejectionReasonRequired`, `InvalidApprovalTransition` or
    /// `NotAuthorized`.
    pub fn reject(
        request: &mut ApprovalRequest,
        actor: &Actor,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(WorkflowError::RejectionReasonRequired);
        }
        if request.status.is_terminal() {
            return Err(WorkflowError::InvalidApprovalTransition {
                from: request.status,
                action: "reject",
            });
        }

        let next_stage = request
            .status
            .completed_stages()
            .and_then(|done| request.required_approvers.get(done).copied());
        if !actor.role.is_elevated() && next_stage != Some(actor.role) {
            return Err(WorkflowError::NotAuthorized(actor.role));
        }

        request.status = RequestStatus::Rejected;
        request.rejection_reason = Some(reason.to_string());
        request.updated_at = now;
        Ok(())
    }

    /// Withdraws a request. Allowed for its creator or an elevated role.
    ///
    /// # Errors
    ///
    /// Returns `InvalidApprovalTransition` or `NotAuthorized`.
    pub fn cancel(
        request: &mut ApprovalRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if request.status.is_terminal() {
            return Err(WorkflowError::InvalidApprovalTransition {
                from: request.status,
                action: "cancel",
            });
        }
        if request.created_by != actor.user_id && !actor.role.is_elevated() {
            return Err(WorkflowError::NotAuthorized(actor.role));
        }

        request.status = RequestStatus::Cancelled;
        request.updated_at = now;
        Ok(())
    }

    /// Sends an approved, unpaid request back to the start of the chain.
    ///
    /// # Errors
    ///
    /// Returns `ReopenNotAllowed`.
    pub fn reopen(
        request: &mut ApprovalRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if !actor.role.is_elevated() {
            return Err(WorkflowError::ReopenNotAllowed("admin or owner role required"));
        }
        if request.disbursement_voucher.is_some() {
            return Err(WorkflowError::ReopenNotAllowed("request already disbursed"));
        }
        if request.status != RequestStatus::Approved {
            return Err(WorkflowError::ReopenNotAllowed("request is not approved"));
        }

        request.status = RequestStatus::Pending;
        request.approvals.clear();
        request.updated_at = now;
        Ok(())
    }

    /// Checks that `actor` may pay the request out now.
    ///
    /// # Errors
    ///
    /// Returns `NotAuthorized` or see [`prevent_duplicate_disbursement`].
    pub fn check_disbursement(
        request: &ApprovalRequest,
        actor: &Actor,
    ) -> Result<(), WorkflowError> {
        if !actor.role.can_disburse() {
            return Err(WorkflowError::NotAuthorized(actor.role));
        }
        prevent_duplicate_disbursement(request)
    }

    /// Records the voucher that paid the request out.
    pub fn mark_disbursed(
        request: &mut ApprovalRequest,
        voucher: JournalEntryId,
        now: DateTime<Utc>,
    ) {
        request.disbursement_voucher = Some(voucher);
        request.status = RequestStatus::Disbursed;
        request.updated_at = now;
    }
}
