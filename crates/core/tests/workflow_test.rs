//! Refund and dividend approvals, from request to disbursement voucher.

mod common;

use common::{Books, books, date};
use folio_core::ledger::{AccountSubtype, ReferenceType};
use folio_core::posting::PostingError;
use folio_core::workflow::{ApprovalRequest, RequestKind, RequestStatus, UserRole, WorkflowError};
use folio_shared::types::{Currency, TenantId, UserId};
use rstest::rstest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

async fn request(books: &Books, kind: RequestKind, amount: Decimal) -> ApprovalRequest {
    books
        .engine
        .create_request(&books.as_role(UserRole::Staff), kind, amount, Currency::USD, None)
        .await
        .unwrap()
}

/// Signs every required stage with a fresh user of the stage role.
async fn approved(books: &Books, kind: RequestKind, amount: Decimal) -> ApprovalRequest {
    let mut req = request(books, kind, amount).await;
    for stage in req.required_approvers.clone() {
        req = books.engine.approve(&books.as_role(stage), req.id).await.unwrap();
    }
    assert_eq!(req.status, RequestStatus::Approved);
    req
}

fn workflow_code(err: &PostingError) -> &'static str {
    match err {
        PostingError::Workflow(e) => e.error_code(),
        other => panic!("expected a workflow error, got {other:?}"),
    }
}

// ============================================================================
// Approval chain
// ============================================================================

#[rstest]
#[case(dec!(500), 1)]
#[case(dec!(1000), 1)]
#[case(dec!(3000), 2)]
#[case(dec!(9000), 3)]
#[tokio::test]
async fn test_stages_follow_amount_tiers(#[case] amount: Decimal, #[case] stages: usize) {
    let books = books(Currency::USD).await;
    let req = request(&books, RequestKind::Refund, amount).await;
    assert_eq!(req.status, RequestStatus::Pending);
    assert_eq!(req.required_approvers.len(), stages);
    assert_eq!(req.required_approvers[0], UserRole::BranchManager);
}

#[tokio::test]
async fn test_chain_signs_in_order() {
    let books = books(Currency::USD).await;
    let req = request(&books, RequestKind::Dividend, dec!(9000)).await;

    let err = books
        .engine
        .approve(&books.as_role(UserRole::FinanceManager), req.id)
        .await
        .unwrap_err();
    assert_eq!(workflow_code(&err), "APPROVAL_DENIED");

    let req = books.engine.approve(&books.as_role(UserRole::BranchManager), req.id).await.unwrap();
    assert_eq!(req.status, RequestStatus::BranchApproved);
    let req = books.engine.approve(&books.as_role(UserRole::FinanceManager), req.id).await.unwrap();
    assert_eq!(req.status, RequestStatus::FinanceApproved);
    let req = books.engine.approve(&books.as_role(UserRole::GeneralManager), req.id).await.unwrap();
    assert_eq!(req.status, RequestStatus::Approved);
    assert_eq!(req.approvals.len(), 3);

    let err = books
        .engine
        .approve(&books.as_role(UserRole::GeneralManager), req.id)
        .await
        .unwrap_err();
    assert_eq!(workflow_code(&err), "INVALID_APPROVAL_TRANSITION");
}

#[tokio::test]
async fn test_rejection_needs_reason_and_ends_the_chain() {
    let books = books(Currency::USD).await;
    let req = request(&books, RequestKind::Refund, dec!(300)).await;
    let manager = books.as_role(UserRole::BranchManager);

    let err = books.engine.reject(&manager, req.id, "  ").await.unwrap_err();
    assert_eq!(workflow_code(&err), "REJECTION_REASON_REQUIRED");

    let rejected = books.engine.reject(&manager, req.id, "duplicate claim").await.unwrap();
    assert_eq!(rejected.status, RequestStatus::Rejected);
    assert_eq!(rejected.rejection_reason.as_deref(), Some("duplicate claim"));

    let err = books.engine.approve(&manager, req.id).await.unwrap_err();
    assert_eq!(workflow_code(&err), "INVALID_APPROVAL_TRANSITION");
}

#[tokio::test]
async fn test_only_creator_or_admin_cancels() {
    let books = books(Currency::USD).await;
    let creator = books.as_role(UserRole::Staff);
    let req = books
        .engine
        .create_request(&creator, RequestKind::Refund, dec!(80), Currency::USD, None)
        .await
        .unwrap();

    let err = books
        .engine
        .cancel(&books.as_role(UserRole::Staff), req.id)
        .await
        .unwrap_err();
    assert_eq!(workflow_code(&err), "NOT_AUTHORIZED");

    let cancelled = books.engine.cancel(&creator, req.id).await.unwrap();
    assert_eq!(cancelled.status, RequestStatus::Cancelled);
}

#[tokio::test]
async fn test_requests_are_tenant_scoped() {
    let books = books(Currency::USD).await;
    let req = request(&books, RequestKind::Refund, dec!(80)).await;
    let outsider =
        folio_core::workflow::Actor::new(TenantId::new(), UserId::new(), UserRole::BranchManager);

    let err = books.engine.approve(&outsider, req.id).await.unwrap_err();
    assert_eq!(workflow_code(&err), "REQUEST_NOT_FOUND");
    assert_eq!(err.http_status_code(), 404);
}

// ============================================================================
// Disbursement
// ============================================================================

#[tokio::test]
async fn test_disbursement_posts_one_voucher() {
    let books = books(Currency::USD).await;
    let req = approved(&books, RequestKind::Refund, dec!(500)).await;

    let paid = books.engine.disburse(&books.actor, req.id, date(10)).await.unwrap();
    assert_eq!(paid.status, RequestStatus::Disbursed);
    let voucher = paid.disbursement_voucher.unwrap();

    let state = books.store.snapshot().await;
    let entry = state.entries.iter().find(|e| e.id == voucher).unwrap();
    assert_eq!(entry.reference.reference_type, ReferenceType::RefundDisbursement);
    assert_eq!(entry.reference.reference_id, Some(req.id.into_inner()));
    assert_eq!(books.net(AccountSubtype::Cash).await, dec!(-500));
    assert_eq!(books.net(AccountSubtype::SalesReturns).await, dec!(500));

    let err = books.engine.disburse(&books.actor, req.id, date(11)).await.unwrap_err();
    assert!(matches!(
        err,
        PostingError::Workflow(WorkflowError::DuplicateDisbursement(v)) if v == voucher
    ));
    assert_eq!(err.http_status_code(), 409);
    assert_eq!(books.store.snapshot().await.entries.len(), 1);
}

#[tokio::test]
async fn test_dividend_voucher_reduces_retained_earnings() {
    let books = books(Currency::USD).await;
    let req = approved(&books, RequestKind::Dividend, dec!(2500)).await;

    books.engine.disburse(&books.actor, req.id, date(15)).await.unwrap();
    assert_eq!(books.net(AccountSubtype::RetainedEarnings).await, dec!(2500));
    assert_eq!(books.net(AccountSubtype::Cash).await, dec!(-2500));
}

#[tokio::test]
async fn test_disbursement_preconditions() {
    let books = books(Currency::USD).await;
    let pending = request(&books, RequestKind::Refund, dec!(200)).await;

    let err = books.engine.disburse(&books.actor, pending.id, date(10)).await.unwrap_err();
    assert_eq!(workflow_code(&err), "NOT_APPROVED");

    let ready = approved(&books, RequestKind::Refund, dec!(200)).await;
    let err = books
        .engine
        .disburse(&books.as_role(UserRole::BranchManager), ready.id, date(10))
        .await
        .unwrap_err();
    assert_eq!(workflow_code(&err), "NOT_AUTHORIZED");
}

#[tokio::test]
async fn test_failed_voucher_leaves_request_approved() {
    let books = books(Currency::USD).await;
    let req = approved(&books, RequestKind::Refund, dec!(200)).await;

    // April has no period.
    let april = chrono::NaiveDate::from_ymd_opt(2026, 4, 2).unwrap();
    let err = books.engine.disburse(&books.actor, req.id, april).await.unwrap_err();
    assert_eq!(err.error_code(), "NO_PERIOD_DEFINED");

    let state = books.store.snapshot().await;
    let stored = state.requests.iter().find(|r| r.id == req.id).unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    assert!(stored.disbursement_voucher.is_none());
    assert!(state.entries.is_empty());
}

// ============================================================================
// Reopen
// ============================================================================

#[tokio::test]
async fn test_reopen_restarts_the_chain() {
    let books = books(Currency::USD).await;
    let req = approved(&books, RequestKind::Refund, dec!(3000)).await;

    let err = books.engine.reopen(&books.actor, req.id).await.unwrap_err();
    assert_eq!(workflow_code(&err), "REOPEN_NOT_ALLOWED");

    let admin = books.as_role(UserRole::Admin);
    let reopened = books.engine.reopen(&admin, req.id).await.unwrap();
    assert_eq!(reopened.status, RequestStatus::Pending);
    assert!(reopened.approvals.is_empty());
    assert_eq!(reopened.required_approvers.len(), 2);

    let again = approved_again(&books, &reopened).await;
    books.engine.disburse(&books.actor, again.id, date(12)).await.unwrap();
    let err = books.engine.reopen(&admin, again.id).await.unwrap_err();
    assert_eq!(workflow_code(&err), "REOPEN_NOT_ALLOWED");
}

async fn approved_again(books: &Books, req: &ApprovalRequest) -> ApprovalRequest {
    let mut req = req.clone();
    for stage in req.required_approvers.clone() {
        req = books.engine.approve(&books.as_role(stage), req.id).await.unwrap();
    }
    req
}
