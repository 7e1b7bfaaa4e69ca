//! Double-entry ledger: journals, entries and the writer that posts them.
//!
//! This module implements the core ledger functionality:
//! - Journal and entry types, balanced by construction and re-checked
//! - Typed journal metadata per event kind
//! - Expense and invoice records used for payment tracking
//! - Store traits for atomic units of work, plus an in-memory store
//! - The ledger writer: idempotent posting of business events

pub mod entry;
pub mod error;
pub mod journal;
pub mod memory;
pub mod metadata;
pub mod records;
pub mod store;
pub mod types;
pub mod validation;
pub mod writer;

#[cfg(test)]
mod validation_props;

pub use entry::LedgerEntry;
pub use error::{FieldError, PostingError, StoreError};
pub use journal::Journal;
pub use memory::MemoryLedgerStore;
pub use metadata::{PaymentTarget, PostingMetadata};
pub use records::{ExpenseRecord, InvoiceRecord};
pub use store::{LedgerStore, LedgerUnitOfWork};
pub use types::{
    DuplicateKind, EntryDraft, JournalKind, PaymentStatus, PostedEntry, PostingPreview, PostingResult,
    Side,
};
pub use validation::validate_entries;
pub use writer::LedgerWriter;
