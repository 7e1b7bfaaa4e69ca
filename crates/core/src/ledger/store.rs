//! Ledger persistence seams.
//!
//! [`LedgerStore`] serves the reads the writer needs before a posting
//! starts (chart snapshot, tenant profile, replay lookups).
//! [`LedgerUnitOfWork`] is one atomic write: everything it does becomes
//! visible on [`commit`](LedgerUnitOfWork::commit) or not at all.
//!
//! Implemented by the db crate for Postgres and by
//! [`MemoryLedgerStore`](super::memory::MemoryLedgerStore) for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tally_shared::types::{AccountId, AssetId, ExpenseId, InvoiceId, JournalId, ProductId, TenantId};

use super::error::StoreError;
use super::journal::Journal;
use super::records::{ExpenseRecord, InvoiceRecord};
use crate::chart::{ChartOfAccounts, TenantProfile};
use crate::depreciation::Asset;
use crate::inventory::{InventoryLot, InventoryTxn};

/// Read access outside any unit of work.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Snapshot of a tenant's chart of accounts.
    async fn chart(&self, tenant_id: TenantId) -> Result<Arc<ChartOfAccounts>, StoreError>;

    /// Posting settings of a tenant, or the defaults when none are stored.
    async fn tenant_profile(&self, tenant_id: TenantId) -> Result<TenantProfile, StoreError>;

    /// Journal with this reference, entries included.
    async fn find_journal(
        &self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<Journal>, StoreError>;

    /// Current lots of a product, without locking.
    async fn lots(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<InventoryLot>, StoreError>;

    /// Starts an atomic unit of work.
    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, StoreError>;
}

/// One atomic write against the ledger.
///
/// Dropping a unit of work without committing discards it.
#[async_trait]
pub trait LedgerUnitOfWork: Send {
    /// Serializes writers posting the same reference until commit.
    async fn lock_reference(&mut self, tenant_id: TenantId, reference: &str) -> Result<(), StoreError>;

    /// Journal with this reference, as seen inside the unit of work.
    async fn find_journal(
        &mut self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<Journal>, StoreError>;

    /// Journal of the invoice with this normalized number.
    async fn find_invoice_journal(
        &mut self,
        tenant_id: TenantId,
        normalized_number: &str,
    ) -> Result<Option<Journal>, StoreError>;

    /// Journal by id, entries included.
    async fn load_journal(
        &mut self,
        tenant_id: TenantId,
        journal_id: JournalId,
    ) -> Result<Option<Journal>, StoreError>;

    /// Ids of the active accounts among `codes`. Missing codes are absent from the map.
    async fn account_ids(
        &mut self,
        tenant_id: TenantId,
        codes: &[String],
    ) -> Result<HashMap<String, AccountId>, StoreError>;

    /// Lots of a product, locked until commit.
    async fn lock_lots(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<InventoryLot>, StoreError>;

    /// Persists `remaining_qty` of existing lots.
    async fn update_lots(&mut self, lots: &[InventoryLot]) -> Result<(), StoreError>;

    /// Inserts newly received lots.
    async fn insert_lots(&mut self, lots: &[InventoryLot]) -> Result<(), StoreError>;

    /// Inserts lot movement audit rows.
    async fn insert_inventory_txns(&mut self, txns: &[InventoryTxn]) -> Result<(), StoreError>;

    /// Inserts a journal and its entries.
    ///
    /// A reference already taken yields [`StoreError::UniqueViolation`].
    async fn insert_journal(&mut self, journal: &Journal) -> Result<(), StoreError>;

    /// Inserts an expense record.
    async fn insert_expense(&mut self, record: &ExpenseRecord) -> Result<(), StoreError>;

    /// Inserts an invoice record.
    ///
    /// A normalized number already taken yields [`StoreError::UniqueViolation`].
    async fn insert_invoice(&mut self, record: &InvoiceRecord) -> Result<(), StoreError>;

    /// Expense record by id, locked until commit.
    async fn load_expense(
        &mut self,
        tenant_id: TenantId,
        expense_id: ExpenseId,
    ) -> Result<Option<ExpenseRecord>, StoreError>;

    /// Invoice record by id, locked until commit.
    async fn load_invoice(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<InvoiceRecord>, StoreError>;

    /// Persists `amount_paid` and status of an expense.
    async fn update_expense_settlement(&mut self, record: &ExpenseRecord) -> Result<(), StoreError>;

    /// Persists `amount_paid` and status of an invoice.
    async fn update_invoice_settlement(&mut self, record: &InvoiceRecord) -> Result<(), StoreError>;

    /// Asset by id, locked until commit.
    async fn load_asset(
        &mut self,
        tenant_id: TenantId,
        asset_id: AssetId,
    ) -> Result<Option<Asset>, StoreError>;

    /// Persists accumulated depreciation, status and next run date.
    async fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError>;

    /// Makes every write visible.
    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    /// Discards every write.
    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
