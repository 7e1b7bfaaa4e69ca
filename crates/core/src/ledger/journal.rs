//! Journal aggregate.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{JournalId, TenantId};

use super::entry::LedgerEntry;
use super::metadata::PostingMetadata;
use super::types::{DuplicateKind, EntryDraft, JournalKind, PostingResult};

/// A committed journal: header plus its balanced entries.
///
/// Journals are immutable once written. Corrections are new journals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    /// Unique identifier.
    pub id: JournalId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Accounting date.
    pub date: NaiveDate,
    /// Journal description.
    pub description: String,
    /// Idempotency reference, unique per tenant.
    pub reference: String,
    /// Debit total.
    pub amount: Decimal,
    /// What produced the journal.
    pub kind: JournalKind,
    /// Kind-specific details.
    pub metadata: PostingMetadata,
    /// When the journal was written.
    pub created_at: DateTime<Utc>,
    /// Entries in line order.
    pub entries: Vec<LedgerEntry>,
}

impl Journal {
    /// Result for a caller, flagged as existing when `duplicate` is set.
    #[must_use]
    pub fn to_result(&self, duplicate: Option<DuplicateKind>) -> PostingResult {
        PostingResult {
            journal_id: self.id,
            reference: self.reference.clone(),
            entries: self.entries.iter().map(LedgerEntry::to_posted).collect(),
            is_existing: duplicate.is_some(),
            duplicate,
        }
    }

    /// Lines without stored ids.
    #[must_use]
    pub fn drafts(&self) -> Vec<EntryDraft> {
        self.entries.iter().map(LedgerEntry::to_draft).collect()
    }
}
