//! Reversing entries for voided payments.
//!
//! A void never mutates the original journal. It posts a new journal
//! whose entries swap debits and credits line by line.

use crate::ledger::journal::Journal;
use crate::ledger::types::EntryDraft;

/// Creates reversing lines by swapping the side of every original line.
///
/// Accounts and amounts are preserved; descriptions are prefixed with
/// `Reversal: `.
#[must_use]
pub fn reversing_entries(original: &Journal) -> Vec<EntryDraft> {
    original
        .entries
        .iter()
        .map(|entry| EntryDraft {
            account_code: entry.account_code.clone(),
            side: entry.side.flip(),
            amount: entry.amount,
            description: Some(format!(
                "Reversal: {}",
                entry.description.clone().unwrap_or_default()
            )),
        })
        .collect()
}

/// Description of the reversing journal.
#[must_use]
pub fn reversal_description(original: &Journal, reason: &str) -> String {
    format!("Reversal of journal {}. Reason: {reason}", original.reference)
}
