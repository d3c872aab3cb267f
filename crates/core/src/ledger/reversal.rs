//! Reversing lines for posted entries.

use super::entry::NewLine;

/// Creates reversing lines by swapping debits and credits.
///
/// Accounts, original amounts and order are preserved; descriptions are
/// prefixed with "Reversal: ".
#[must_use]
pub fn reversing_lines(lines: &[NewLine]) -> Vec<NewLine> {
    lines
        .iter()
        .map(|line| NewLine {
            account_id: line.account_id,
            debit: line.credit,
            credit: line.debit,
            original: line.original,
            description: Some(format!(
                "Reversal: {}",
                line.description.clone().unwrap_or_default()
            )),
        })
        .collect()
}
