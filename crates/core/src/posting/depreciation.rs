//! Depreciation journal construction.

use rust_decimal::Decimal;

use crate::chart::PostingAccounts;
use crate::depreciation::Asset;
use crate::calendar::YearMonth;
use crate::ledger::types::EntryDraft;

/// Debit depreciation expense, credit accumulated depreciation.
#[must_use]
pub fn build_depreciation(
    asset: &Asset,
    period: YearMonth,
    charge: Decimal,
    posting: &PostingAccounts,
) -> Vec<EntryDraft> {
    let memo = Some(format!("Depreciation of {} for {}", asset.name, period.label()));
    vec![
        EntryDraft::debit(&posting.depreciation_expense, charge, memo.clone()),
        EntryDraft::credit(&posting.accumulated_depreciation, charge, memo),
    ]
}
