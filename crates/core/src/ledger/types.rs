//! Ledger domain types for journal construction and posting results.
//!
//! This module defines the core types shared by the posting builders,
//! the ledger writer, and the stores.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::JournalId;

/// Entry side: either Debit or Credit.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/revenue accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/revenue accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Debit entry.
    Debit,
    /// Credit entry.
    Credit,
}

impl Side {
    /// The opposite side.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Lowercase storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            _ => Err(format!("Unknown entry side: {s}")),
        }
    }
}

/// Journal kind, one per business event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalKind {
    /// Expense bill (or its refund).
    Expense,
    /// Customer invoice.
    Invoice,
    /// Payment against an expense or invoice.
    Payment,
    /// Reversal of a payment.
    Void,
    /// Monthly straight-line depreciation.
    Depreciation,
}

impl JournalKind {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Expense => "expense",
            Self::Invoice => "invoice",
            Self::Payment => "payment",
            Self::Void => "void",
            Self::Depreciation => "depreciation",
        }
    }
}

impl FromStr for JournalKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "expense" => Ok(Self::Expense),
            "invoice" => Ok(Self::Invoice),
            "payment" => Ok(Self::Payment),
            "void" => Ok(Self::Void),
            "depreciation" => Ok(Self::Depreciation),
            _ => Err(format!("Unknown journal kind: {s}")),
        }
    }
}

/// Settlement status of an expense or invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Settled in full at posting time.
    #[default]
    Paid,
    /// Nothing paid yet.
    Unpaid,
    /// Part of the amount paid.
    Partial,
    /// More than the amount paid.
    Overpaid,
    /// Money returned by the counterparty.
    Refunded,
}

impl PaymentStatus {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
            Self::Partial => "partial",
            Self::Overpaid => "overpaid",
            Self::Refunded => "refunded",
        }
    }

    /// Status implied by an amount paid against a total.
    #[must_use]
    pub fn from_amounts(total: Decimal, paid: Decimal) -> Self {
        if paid <= Decimal::ZERO {
            Self::Unpaid
        } else if paid < total {
            Self::Partial
        } else if paid == total {
            Self::Paid
        } else {
            Self::Overpaid
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            "partial" => Ok(Self::Partial),
            "overpaid" => Ok(Self::Overpaid),
            "refunded" => Ok(Self::Refunded),
            _ => Err(format!("Unknown payment status: {s}")),
        }
    }
}

/// A journal line before it is bound to stored account ids.
///
/// Builders produce these; previews return them unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryDraft {
    /// Account code to post to.
    pub account_code: String,
    /// Debit or credit.
    pub side: Side,
    /// Non-negative amount in the reference currency.
    pub amount: Decimal,
    /// Optional line description.
    pub description: Option<String>,
}

impl EntryDraft {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_code: &str, amount: Decimal, description: Option<String>) -> Self {
        Self {
            account_code: account_code.to_string(),
            side: Side::Debit,
            amount,
            description,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_code: &str, amount: Decimal, description: Option<String>) -> Self {
        Self {
            account_code: account_code.to_string(),
            side: Side::Credit,
            amount,
            description,
        }
    }

    /// The same line on the opposite side.
    #[must_use]
    pub fn flipped(mut self) -> Self {
        self.side = self.side.flip();
        self
    }
}

/// Journal totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalTotals {
    /// Total debit amount.
    pub debit: Decimal,
    /// Total credit amount.
    pub credit: Decimal,
}

impl JournalTotals {
    /// Sums the sides of a set of lines.
    #[must_use]
    pub fn of(entries: &[EntryDraft]) -> Self {
        let mut totals = Self {
            debit: Decimal::ZERO,
            credit: Decimal::ZERO,
        };
        for entry in entries {
            match entry.side {
                Side::Debit => totals.debit += entry.amount,
                Side::Credit => totals.credit += entry.amount,
            }
        }
        totals
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Why a posting resolved to an existing journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateKind {
    /// A journal with the same idempotency reference exists.
    Reference,
    /// An invoice with the same normalized number exists.
    InvoiceNumber,
}

impl DuplicateKind {
    /// Code reported to callers alongside the successful result.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Reference => "DUPLICATE_REFERENCE",
            Self::InvoiceNumber => "DUPLICATE_INVOICE_NUMBER",
        }
    }
}

/// A committed line as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedEntry {
    /// Account code.
    pub account_code: String,
    /// Debit or credit.
    pub side: Side,
    /// Amount.
    pub amount: Decimal,
    /// Line description.
    pub description: Option<String>,
}

/// Result of a posting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingResult {
    /// The journal id (the original one for duplicates).
    pub journal_id: JournalId,
    /// The idempotency reference.
    pub reference: String,
    /// The journal's lines.
    pub entries: Vec<PostedEntry>,
    /// True if nothing was written because the journal already existed.
    pub is_existing: bool,
    /// Which key matched when `is_existing`.
    pub duplicate: Option<DuplicateKind>,
}

/// Would-be posting computed without writing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostingPreview {
    /// The reference the posting would use.
    pub reference: String,
    /// The lines the posting would write.
    pub entries: Vec<EntryDraft>,
    /// True if a journal with this reference already exists.
    pub already_posted: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_side_flip_and_parse() {
        assert_eq!(Side::Debit.flip(), Side::Credit);
        assert_eq!(Side::Credit.flip(), Side::Debit);
        assert_eq!("debit".parse::<Side>(), Ok(Side::Debit));
        assert!("DR".parse::<Side>().is_err());
    }

    #[test]
    fn test_payment_status_from_amounts() {
        assert_eq!(PaymentStatus::from_amounts(dec!(100), dec!(0)), PaymentStatus::Unpaid);
        assert_eq!(PaymentStatus::from_amounts(dec!(100), dec!(40)), PaymentStatus::Partial);
        assert_eq!(PaymentStatus::from_amounts(dec!(100), dec!(100)), PaymentStatus::Paid);
        assert_eq!(PaymentStatus::from_amounts(dec!(100), dec!(120)), PaymentStatus::Overpaid);
    }

    #[test]
    fn test_journal_totals() {
        let entries = vec![
            EntryDraft::debit("6100", dec!(60), None),
            EntryDraft::debit("6900", dec!(40), None),
            EntryDraft::credit("1000", dec!(100), None),
        ];
        let totals = JournalTotals::of(&entries);
        assert_eq!(totals.debit, dec!(100));
        assert_eq!(totals.credit, dec!(100));
        assert_eq!(totals.difference(), Decimal::ZERO);
    }

    #[test]
    fn test_entry_flipped() {
        let entry = EntryDraft::debit("6100", dec!(5), None).flipped();
        assert_eq!(entry.side, Side::Credit);
        assert_eq!(entry.amount, dec!(5));
    }

    #[test]
    fn test_duplicate_codes() {
        assert_eq!(DuplicateKind::Reference.code(), "DUPLICATE_REFERENCE");
        assert_eq!(DuplicateKind::InvoiceNumber.code(), "DUPLICATE_INVOICE_NUMBER");
    }
}
