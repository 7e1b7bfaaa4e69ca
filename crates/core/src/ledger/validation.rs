//! Balance validation for journals about to be written.

use rust_decimal::Decimal;
use tally_shared::types::money::{BALANCE_TOLERANCE, round_cents};

use super::error::PostingError;
use super::types::{EntryDraft, JournalTotals, Side};

/// Removes zero-amount lines, which carry no accounting meaning.
#[must_use]
pub fn without_zero_lines(entries: Vec<EntryDraft>) -> Vec<EntryDraft> {
    entries
        .into_iter()
        .filter(|e| e.amount != Decimal::ZERO)
        .collect()
}

/// Validates that a set of journal lines is balanced.
///
/// A journal must have at least one debit and one credit, no negative
/// amounts, and debits equal to credits within the cent tolerance.
/// Any failure is a builder bug and is reported as an invariant violation.
///
/// # Errors
///
/// Returns [`PostingError::InvariantViolation`] with the computed totals.
pub fn validate_entries(entries: &[EntryDraft]) -> Result<JournalTotals, PostingError> {
    let totals = JournalTotals::of(entries);
    let violation = || PostingError::InvariantViolation {
        debits: totals.debit,
        credits: totals.credit,
    };

    if entries.iter().any(|e| e.amount < Decimal::ZERO) {
        return Err(violation());
    }

    let has_debit = entries.iter().any(|e| e.side == Side::Debit);
    let has_credit = entries.iter().any(|e| e.side == Side::Credit);
    if !has_debit || !has_credit {
        return Err(violation());
    }

    if round_cents(totals.difference()).abs() > BALANCE_TOLERANCE {
        return Err(violation());
    }

    Ok(totals)
}
