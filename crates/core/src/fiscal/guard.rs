//! Period guard: decides whether a date may receive postings.

use chrono::NaiveDate;
use folio_shared::types::PeriodId;
use serde::{Deserialize, Serialize};

use super::error::FiscalError;
use super::period::{AccountingPeriod, PeriodStatus};
use crate::ledger::LedgerError;

/// Result of looking a date up in a tenant's calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "period_id", rename_all = "snake_case")]
pub enum PeriodClassification {
    /// Covered by an open period.
    Open(PeriodId),
    /// Covered by a closed period.
    Closed(PeriodId),
    /// Covered by a locked period.
    Locked(PeriodId),
    /// No period covers the date.
    NoPeriodDefined,
}

/// Classifies `date` against the tenant's periods.
#[must_use]
pub fn classify(periods: &[AccountingPeriod], date: NaiveDate) -> PeriodClassification {
    periods
        .iter()
        .find(|p| p.contains_date(date))
        .map_or(PeriodClassification::NoPeriodDefined, |p| match p.status {
            PeriodStatus::Open => PeriodClassification::Open(p.id),
            PeriodStatus::Closed => PeriodClassification::Closed(p.id),
            PeriodStatus::Locked => PeriodClassification::Locked(p.id),
        })
}

/// Ensures `date` falls in an open period and returns that period.
///
/// A date outside every defined period is rejected: no implicit period exists.
///
/// # Errors
///
/// Returns `PeriodClosed`, `PeriodLocked` or `NoPeriodDefined`.
pub fn ensure_postable(
    periods: &[AccountingPeriod],
    date: NaiveDate,
) -> Result<PeriodId, LedgerError> {
    match classify(periods, date) {
        PeriodClassification::Open(id) => Ok(id),
        PeriodClassification::Closed(period) => Err(LedgerError::PeriodClosed { date, period }),
        PeriodClassification::Locked(period) => Err(LedgerError::PeriodLocked { date, period }),
        PeriodClassification::NoPeriodDefined => Err(LedgerError::NoPeriodDefined(date)),
    }
}

/// Validates a new period against the tenant's calendar.
///
/// The range must be well-formed, must not overlap any existing period and
/// must attach directly before the first or after the last period.
///
/// # Errors
///
/// Returns `InvalidDateRange`, `OverlappingPeriod` or `NonContiguousPeriod`.
pub fn validate_new_period(
    existing: &[AccountingPeriod],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<(), FiscalError> {
    if start > end {
        return Err(FiscalError::InvalidDateRange { start, end });
    }

    if let Some(clash) = existing
        .iter()
        .find(|p| start <= p.end_date && p.start_date <= end)
    {
        return Err(FiscalError::OverlappingPeriod(clash.id));
    }

    let first_start = existing.iter().map(|p| p.start_date).min();
    let last_end = existing.iter().map(|p| p.end_date).max();

    if let (Some(first_start), Some(last_end)) = (first_start, last_end) {
        let expected_start = last_end.succ_opt().unwrap_or(last_end);
        let expected_end = first_start.pred_opt().unwrap_or(first_start);
        if start != expected_start && end != expected_end {
            return Err(FiscalError::NonContiguousPeriod {
                expected_start,
                expected_end,
            });
        }
    }

    Ok(())
}

/// Validates a status change of `period_id`.
///
/// Closing requires every earlier period to be closed first.
///
/// # Errors
///
/// Returns `PeriodNotFound`, `InvalidStatusTransition` or `EarlierPeriodsOpen`.
pub fn validate_transition(
    periods: &[AccountingPeriod],
    period_id: PeriodId,
    to: PeriodStatus,
) -> Result<(), FiscalError> {
    let period = periods
        .iter()
        .find(|p| p.id == period_id)
        .ok_or(FiscalError::PeriodNotFound(period_id))?;

    if !period.status.can_transition_to(to) {
        return Err(FiscalError::InvalidStatusTransition {
            from: period.status,
            to,
        });
    }

    if to == PeriodStatus::Closed
        && let Some(open) = periods
            .iter()
            .find(|p| p.end_date < period.start_date && p.status == PeriodStatus::Open)
    {
        return Err(FiscalError::EarlierPeriodsOpen(open.id));
    }

    Ok(())
}
