//! Ledger entry domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, EntryId, JournalId};

use super::types::{EntryDraft, PostedEntry, Side};

/// A single committed line of a journal.
///
/// Each journal consists of multiple entries that must balance (debits = credits).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique identifier for this entry.
    pub id: EntryId,
    /// The journal this entry belongs to.
    pub journal_id: JournalId,
    /// The account affected by this entry.
    pub account_id: AccountId,
    /// Code of the affected account, denormalized for results and previews.
    pub account_code: String,
    /// Whether this is a debit or credit.
    pub side: Side,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Optional description for this line.
    pub description: Option<String>,
}

impl LedgerEntry {
    /// Binds a draft line to a journal and a stored account.
    #[must_use]
    pub fn from_draft(journal_id: JournalId, account_id: AccountId, draft: &EntryDraft) -> Self {
        Self {
            id: EntryId::new(),
            journal_id,
            account_id,
            account_code: draft.account_code.clone(),
            side: draft.side,
            amount: draft.amount,
            description: draft.description.clone(),
        }
    }

    /// The line as a draft, dropping stored ids.
    #[must_use]
    pub fn to_draft(&self) -> EntryDraft {
        EntryDraft {
            account_code: self.account_code.clone(),
            side: self.side,
            amount: self.amount,
            description: self.description.clone(),
        }
    }

    /// The line as returned to callers.
    #[must_use]
    pub fn to_posted(&self) -> PostedEntry {
        PostedEntry {
            account_code: self.account_code.clone(),
            side: self.side,
            amount: self.amount,
            description: self.description.clone(),
        }
    }
}
