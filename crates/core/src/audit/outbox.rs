//! Audit events written to the transactional outbox.

use chrono::{DateTime, Utc};
use folio_shared::types::{OutboxEventId, TenantId, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A business event was posted for the first time.
    EntryPosted,
    /// An existing posting was re-derived.
    EntryAmended,
    /// An entry was reversed.
    EntryReversed,
    /// A period was created.
    PeriodDefined,
    /// A period was closed.
    PeriodClosed,
    /// A period was locked.
    PeriodLocked,
    /// Lots were received.
    LotReceived,
    /// Stock was reconciled to a count.
    InventoryReconciled,
    /// Display amounts were written.
    Restated,
    /// Display amounts were cleared.
    RestatementReset,
    /// An approval request was created.
    RequestCreated,
    /// An approval stage was signed.
    RequestApproved,
    /// A request was rejected.
    RequestRejected,
    /// A request was cancelled.
    RequestCancelled,
    /// A request was paid out.
    RequestDisbursed,
    /// A request was sent back to the start of the chain.
    RequestReopened,
}

impl AuditAction {
    /// Every action, in declaration order.
    pub const ALL: [Self; 16] = [
        Self::EntryPosted,
        Self::EntryAmended,
        Self::EntryReversed,
        Self::PeriodDefined,
        Self::PeriodClosed,
        Self::PeriodLocked,
        Self::LotReceived,
        Self::InventoryReconciled,
        Self::Restated,
        Self::RestatementReset,
        Self::RequestCreated,
        Self::RequestApproved,
        Self::RequestRejected,
        Self::RequestCancelled,
        Self::RequestDisbursed,
        Self::RequestReopened,
    ];

    /// Parses an action from its string form.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|action| action.as_str() == s)
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EntryPosted => "entry_posted",
            Self::EntryAmended => "entry_amended",
            Self::EntryReversed => "entry_reversed",
            Self::PeriodDefined => "period_defined",
            Self::PeriodClosed => "period_closed",
            Self::PeriodLocked => "period_locked",
            Self::LotReceived => "lot_received",
            Self::InventoryReconciled => "inventory_reconciled",
            Self::Restated => "restated",
            Self::RestatementReset => "restatement_reset",
            Self::RequestCreated => "request_created",
            Self::RequestApproved => "request_approved",
            Self::RequestRejected => "request_rejected",
            Self::RequestCancelled => "request_cancelled",
            Self::RequestDisbursed => "request_disbursed",
            Self::RequestReopened => "request_reopened",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record, committed with the change it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxEvent {
    /// Unique identifier, time-ordered.
    pub id: OutboxEventId,
    /// Tenant the change belongs to.
    pub tenant_id: TenantId,
    /// What happened.
    pub action: AuditAction,
    /// Id of the changed object.
    pub subject_id: Uuid,
    /// Who did it.
    pub actor: Option<UserId>,
    /// Event details.
    pub payload: serde_json::Value,
    /// When the change was committed.
    pub created_at: DateTime<Utc>,
    /// When a sink accepted the event.
    pub delivered_at: Option<DateTime<Utc>>,
}

impl OutboxEvent {
    /// Creates an undelivered event.
    #[must_use]
    pub fn new(
        tenant_id: TenantId,
        action: AuditAction,
        subject_id: Uuid,
        actor: Option<UserId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: OutboxEventId::new(),
            tenant_id,
            action,
            subject_id,
            actor,
            payload,
            created_at: Utc::now(),
            delivered_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in AuditAction::ALL {
            assert_eq!(AuditAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(AuditAction::parse("entry_deleted"), None);
    }

    #[test]
    fn test_new_event_is_pending() {
        let event = OutboxEvent::new(
            TenantId::new(),
            AuditAction::PeriodClosed,
            Uuid::new_v4(),
            None,
            serde_json::json!({ "name": "March" }),
        );
        assert!(event.delivered_at.is_none());
        assert_eq!(event.action.to_string(), "period_closed");
    }
}
