//! Chart of accounts: account types, per-tenant snapshots, and the
//! standard seed chart.

pub mod account;
pub mod standard;

pub use account::{Account, AccountType, ChartOfAccounts};
pub use standard::{PostingAccounts, TaxRegime, TenantProfile, codes, standard_chart};
