//! Property-based tests for the approval chain.

use chrono::Utc;
use folio_shared::types::{ApprovalRequestId, Currency, JournalEntryId, TenantId, UserId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use crate::workflow::approval::{
    ApprovalEngine, ApprovalTiers, can_approve, prevent_duplicate_disbursement,
};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{Actor, ApprovalRequest, RequestKind, RequestStatus, UserRole};

fn arb_amount() -> impl Strategy<Value = Decimal> {
    (1i64..2_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_role() -> impl Strategy<Value = UserRole> {
    prop_oneof![
        Just(UserRole::Viewer),
        Just(UserRole::Staff),
        Just(UserRole::Accountant),
        Just(UserRole::BranchManager),
        Just(UserRole::FinanceManager),
        Just(UserRole::GeneralManager),
        Just(UserRole::Admin),
        Just(UserRole::Owner),
    ]
}

fn arb_status() -> impl Strategy<Value = RequestStatus> {
    prop_oneof![
        Just(RequestStatus::Pending),
        Just(RequestStatus::BranchApproved),
        Just(RequestStatus::FinanceApproved),
        Just(RequestStatus::Approved),
        Just(RequestStatus::Disbursed),
        Just(RequestStatus::Rejected),
        Just(RequestStatus::Cancelled),
    ]
}

fn request(amount: Decimal) -> ApprovalRequest {
    let now = Utc::now();
    ApprovalRequest {
        id: ApprovalRequestId::new(),
        tenant_id: TenantId::new(),
        kind: RequestKind::Dividend,
        amount,
        currency: Currency::USD,
        source_document: None,
        status: RequestStatus::Pending,
        required_approvers: ApprovalTiers::default().required_approvers(amount),
        approvals: vec![],
        disbursement_voucher: None,
        rejection_reason: None,
        created_by: UserId::new(),
        created_at: now,
        updated_at: now,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Tiers are cumulative and always start with the branch manager.
    #[test]
    fn prop_tiers_monotonic(a in arb_amount(), b in arb_amount()) {
        let tiers = ApprovalTiers::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let low_chain = tiers.required_approvers(low);
        let high_chain = tiers.required_approvers(high);
        prop_assert!(low_chain.len() <= high_chain.len());
        prop_assert_eq!(&high_chain[..low_chain.len()], &low_chain[..]);
        prop_assert_eq!(low_chain[0], UserRole::BranchManager);
    }

    /// Only the exact next-stage role can advance a request.
    #[test]
    fn prop_only_next_stage_role_approves(
        amount in arb_amount(),
        status in arb_status(),
        role in arb_role(),
    ) {
        let required = ApprovalTiers::default().required_approvers(amount);
        let next = status.completed_stages().and_then(|n| required.get(n).copied());
        let result = can_approve(role, status, &required);
        match next {
            Some(expected) if expected == role => prop_assert!(result.is_ok()),
            Some(_) => {
                let denied = matches!(result, Err(WorkflowError::ApprovalDenied { .. }));
                prop_assert!(denied);
            }
            None => {
                let invalid =
                    matches!(result, Err(WorkflowError::InvalidApprovalTransition { .. }));
                prop_assert!(invalid);
            }
        }
    }

    /// Walking the full chain ends in Approved after exactly one sign-off per stage,
    /// and a request can be disbursed at most once.
    #[test]
    fn prop_full_chain_then_single_disbursement(amount in arb_amount()) {
        let mut req = request(amount);
        let now = Utc::now();
        let stages = req.required_approvers.clone();

        for (i, role) in stages.iter().enumerate() {
            prop_assert!(prevent_duplicate_disbursement(&req).is_err());
            let actor = Actor::new(req.tenant_id, UserId::new(), *role);
            let status = ApprovalEngine::approve(&mut req, &actor, now).unwrap();
            if i + 1 == stages.len() {
                prop_assert_eq!(status, RequestStatus::Approved);
            } else {
                prop_assert_ne!(status, RequestStatus::Approved);
            }
        }
        prop_assert_eq!(req.approvals.len(), stages.len());

        prop_assert!(prevent_duplicate_disbursement(&req).is_ok());
        ApprovalEngine::mark_disbursed(&mut req, JournalEntryId::new(), now);
        let duplicate = matches!(
            prevent_duplicate_disbursement(&req),
            Err(WorkflowError::DuplicateDisbursement(_))
        );
        prop_assert!(duplicate);
    }
}
