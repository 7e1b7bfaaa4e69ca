//! `SeaORM` entity definitions.
//!
//! Enumerations are stored as text and parsed with the core types'
//! `FromStr` implementations; structured payloads are JSONB.

pub mod accounts;
pub mod assets;
pub mod expenses;
pub mod inventory_lots;
pub mod inventory_txns;
pub mod invoices;
pub mod journals;
pub mod ledger_entries;
pub mod recurring_rules;
pub mod tenant_profiles;

pub mod prelude {
    //! Entity re-exports.

    pub use super::accounts::Entity as Accounts;
    pub use super::assets::Entity as Assets;
    pub use super::expenses::Entity as Expenses;
    pub use super::inventory_lots::Entity as InventoryLots;
    pub use super::inventory_txns::Entity as InventoryTxns;
    pub use super::invoices::Entity as Invoices;
    pub use super::journals::Entity as Journals;
    pub use super::ledger_entries::Entity as LedgerEntries;
    pub use super::recurring_rules::Entity as RecurringRules;
    pub use super::tenant_profiles::Entity as TenantProfiles;
}
