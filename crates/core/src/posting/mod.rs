//! Business events and the pure functions that turn them into journal lines.
//!
//! Nothing here touches a store: builders take already-resolved account
//! codes and return balanced drafts. The ledger writer runs them inside
//! its unit of work, and previews run the same code without writing.

pub mod allocation;
pub mod depreciation;
pub mod events;
pub mod expense;
pub mod invoice;
pub mod payment;
pub mod reference;
pub mod reversal;
pub mod tax;
pub mod validate;

#[cfg(test)]
mod posting_props;

pub use events::{
    AssetDepreciation, ExpensePosting, InvoicePosting, LineItem, PaymentRecord, PostingEvent,
    TaxSettings, VoidPayment,
};
pub use expense::{ExpenseAccounts, ExpenseDraft, build_expense};
pub use invoice::{InvoiceDraft, build_invoice};
pub use payment::{PaymentDraft, build_payment};
pub use tax::{TaxSplit, split_gross};
