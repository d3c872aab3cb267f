//! Persistence of approval requests.
//!
//! Loads a request inside the caller's transaction, applies an
//! [`ApprovalEngine`] action and writes it back. Disbursement posts a journal
//! entry and therefore lives in the posting engine.

use chrono::Utc;
use folio_shared::types::{ApprovalRequestId, Currency};
use rust_decimal::Decimal;
use tracing::info;

use crate::ledger::SourceRef;
use crate::store::LedgerTx;
use crate::workflow::approval::{ApprovalEngine, ApprovalTiers};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Actor, ApprovalRequest, RequestKind, RequestStatus};

/// Approval request operations for one tier configuration.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowService {
    tiers: ApprovalTiers,
}

impl WorkflowService {
    /// Creates the service.
    #[must_use]
    pub const fn new(tiers: ApprovalTiers) -> Self {
        Self { tiers }
    }

    /// Tier configuration in use.
    #[must_use]
    pub const fn tiers(&self) -> &ApprovalTiers {
        &self.tiers
    }

    /// Opens a request. The approval chain is fixed now from the amount.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` or a storage error.
    pub async fn create_request<T: LedgerTx>(
        &self,
        tx: &mut T,
        actor: &Actor,
        kind: RequestKind,
        amount: Decimal,
        currency: Currency,
        source_document: Option<SourceRef>,
    ) -> Result<ApprovalRequest, WorkflowError> {
        if amount <= Decimal::ZERO {
            return Err(WorkflowError::InvalidAmount(amount));
        }

        let now = Utc::now();
        let request = ApprovalRequest {
            id: ApprovalRequestId::new(),
            tenant_id: actor.tenant_id,
            kind,
            amount,
            currency,
            source_document,
            status: RequestStatus::Pending,
            required_approvers: self.tiers.required_approvers(amount),
            approvals: Vec::new(),
            disbursement_voucher: None,
            rejection_reason: None,
            created_by: actor.user_id,
            created_at: now,
            updated_at: now,
        };
        tx.insert_request(&request).await?;

        info!(
            tenant_id = %actor.tenant_id,
            request_id = %request.id,
            kind = kind.as_str(),
            %amount,
            stages = request.required_approvers.len(),
            "Approval request created"
        );
        Ok(request)
    }

    /// Loads a request of the actor's tenant.
    ///
    /// # Errors
    ///
    /// Returns `RequestNotFound` or a storage error.
    pub async fn load<T: LedgerTx>(
        tx: &mut T,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, WorkflowError> {
        tx.request(actor.tenant_id, id)
            .await?
            .ok_or(WorkflowError::RequestNotFound(id))
    }

    /// Signs the next stage.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::approve`].
    pub async fn approve<T: LedgerTx>(
        &self,
        tx: &mut T,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let mut request = Self::load(tx, actor, id).await?;
        let status = ApprovalEngine::approve(&mut request, actor, Utc::now())?;
        tx.update_request(&request).await?;

        info!(
            request_id = %id, user_id = %actor.user_id, role = %actor.role, %status,
            "Request approved"
        );
        Ok(request)
    }

    /// Rejects a request.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::reject`].
    pub async fn reject<T: LedgerTx>(
        &self,
        tx: &mut T,
        actor: &Actor,
        id: ApprovalRequestId,
        reason: &str,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let mut request = Self::load(tx, actor, id).await?;
        ApprovalEngine::reject(&mut request, actor, reason, Utc::now())?;
        tx.update_request(&request).await?;

        info!(request_id = %id, user_id = %actor.user_id, "Request rejected");
        Ok(request)
    }

    /// Cancels a request.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::cancel`].
    pub async fn cancel<T: LedgerTx>(
        &self,
        tx: &mut T,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let mut request = Self::load(tx, actor, id).await?;
        ApprovalEngine::cancel(&mut request, actor, Utc::now())?;
        tx.update_request(&request).await?;

        info!(request_id = %id, user_id = %actor.user_id, "Request cancelled");
        Ok(request)
    }

    /// Sends an approved request back to `Pending`.
    ///
    /// # Errors
    ///
    /// See [`ApprovalEngine::reopen`].
    pub async fn reopen<T: LedgerTx>(
        &self,
        tx: &mut T,
        actor: &Actor,
        id: ApprovalRequestId,
    ) -> Result<ApprovalRequest, WorkflowError> {
        let mut request = Self::load(tx, actor, id).await?;
        ApprovalEngine::reopen(&mut request, actor, Utc::now())?;
        tx.update_request(&request).await?;

        info!(request_id = %id, user_id = %actor.user_id, "Request reopened");
        Ok(request)
    }
}
