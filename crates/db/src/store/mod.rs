//! Postgres implementations of the core store traits.

mod ledger;
mod rules;

pub use ledger::{PgLedgerStore, PgUnitOfWork};
pub use rules::PgRuleStore;
