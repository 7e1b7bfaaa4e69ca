//! In-process ledger store.
//!
//! A unit of work holds the store lock from `begin` to commit and works
//! on a copy of the state, so writers are fully serialized and an
//! uncommitted unit of work leaves nothing behind. Used by the engine
//! tests and by tools that post without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tally_shared::types::{
    AccountId, AssetId, ExpenseId, InventoryLotId, InvoiceId, JournalId, ProductId, TenantId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::StoreError;
use super::journal::Journal;
use super::records::{ExpenseRecord, InvoiceRecord};
use super::store::{LedgerStore, LedgerUnitOfWork};
use crate::chart::{Account, ChartOfAccounts, TenantProfile, standard_chart};
use crate::depreciation::{Asset, AssetStatus, AssetStore};
use crate::inventory::{InventoryLot, InventoryTxn};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    charts: HashMap<TenantId, Arc<ChartOfAccounts>>,
    profiles: HashMap<TenantId, TenantProfile>,
    journals: Vec<Journal>,
    expenses: HashMap<ExpenseId, ExpenseRecord>,
    invoices: HashMap<InvoiceId, InvoiceRecord>,
    lots: HashMap<InventoryLotId, InventoryLot>,
    inventory_txns: Vec<InventoryTxn>,
    assets: HashMap<AssetId, Asset>,
}

impl LedgerState {
    fn journal_by_reference(&self, tenant_id: TenantId, reference: &str) -> Option<&Journal> {
        self.journals
            .iter()
            .find(|j| j.tenant_id == tenant_id && j.reference == reference)
    }

    fn lots_of(&self, tenant_id: TenantId, product_id: ProductId) -> Vec<InventoryLot> {
        self.lots
            .values()
            .filter(|l| l.tenant_id == tenant_id && l.product_id == product_id)
            .cloned()
            .collect()
    }
}

/// Ledger store kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl MemoryLedgerStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store with the standard chart seeded for `tenant_id`.
    pub async fn with_standard_chart(tenant_id: TenantId) -> Self {
        let store = Self::new();
        store.seed_chart(tenant_id, standard_chart(tenant_id)).await;
        store
    }

    /// Replaces a tenant's chart.
    pub async fn seed_chart(&self, tenant_id: TenantId, accounts: Vec<Account>) {
        let mut state = self.state.lock().await;
        state
            .charts
            .insert(tenant_id, Arc::new(ChartOfAccounts::new(accounts)));
    }

    /// Stores a tenant profile.
    pub async fn set_profile(&self, profile: TenantProfile) {
        self.state
            .lock()
            .await
            .profiles
            .insert(profile.tenant_id, profile);
    }

    /// Adds an inventory lot.
    pub async fn seed_lot(&self, lot: InventoryLot) {
        self.state.lock().await.lots.insert(lot.id, lot);
    }

    /// Adds or replaces an asset.
    pub async fn seed_asset(&self, asset: Asset) {
        self.state.lock().await.assets.insert(asset.id, asset);
    }

    /// Committed journals of a tenant, oldest first.
    pub async fn journals(&self, tenant_id: TenantId) -> Vec<Journal> {
        self.state
            .lock()
            .await
            .journals
            .iter()
            .filter(|j| j.tenant_id == tenant_id)
            .cloned()
            .collect()
    }

    /// Number of committed entries across all journals.
    pub async fn entry_count(&self) -> usize {
        self.state
            .lock()
            .await
            .journals
            .iter()
            .map(|j| j.entries.len())
            .sum()
    }

    /// Expense record by id.
    pub async fn expense(&self, id: ExpenseId) -> Option<ExpenseRecord> {
        self.state.lock().await.expenses.get(&id).cloned()
    }

    /// Invoice record by id.
    pub async fn invoice(&self, id: InvoiceId) -> Option<InvoiceRecord> {
        self.state.lock().await.invoices.get(&id).cloned()
    }

    /// Lot by id.
    pub async fn lot(&self, id: InventoryLotId) -> Option<InventoryLot> {
        self.state.lock().await.lots.get(&id).cloned()
    }

    /// Inventory movements, in insertion order.
    pub async fn inventory_txns(&self) -> Vec<InventoryTxn> {
        self.state.lock().await.inventory_txns.clone()
    }

    /// Asset by id.
    pub async fn asset(&self, id: AssetId) -> Option<Asset> {
        self.state.lock().await.assets.get(&id).cloned()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn chart(&self, tenant_id: TenantId) -> Result<Arc<ChartOfAccounts>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .charts
            .get(&tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn tenant_profile(&self, tenant_id: TenantId) -> Result<TenantProfile, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .profiles
            .get(&tenant_id)
            .cloned()
            .unwrap_or_else(|| TenantProfile::default_for(tenant_id)))
    }

    async fn find_journal(
        &self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<Journal>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .journal_by_reference(tenant_id, reference)
            .cloned())
    }

    async fn lots(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<InventoryLot>, StoreError> {
        Ok(self.state.lock().await.lots_of(tenant_id, product_id))
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryUnitOfWork { guard, work }))
    }
}

#[async_trait]
impl AssetStore for MemoryLedgerStore {
    async fn due_assets(&self, today: NaiveDate, limit: usize) -> Result<Vec<Asset>, StoreError> {
        let state = self.state.lock().await;
        let mut due: Vec<Asset> = state
            .assets
            .values()
            .filter(|a| a.status == AssetStatus::Active && a.next_run_on <= today)
            .cloned()
            .collect();
        due.sort_by_key(|a| (a.next_run_on, a.id));
        due.truncate(limit);
        Ok(due)
    }

    async fn mark_fully_depreciated(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let asset = state
            .assets
            .get_mut(&asset_id)
            .filter(|a| a.tenant_id == tenant_id)
            .ok_or(StoreError::NotFound)?;
        asset.status = AssetStatus::FullyDepreciated;
        Ok(())
    }
}

/// Unit of work over a private copy of the store state.
pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<LedgerState>,
    work: LedgerState,
}

#[async_trait]
impl LedgerUnitOfWork for MemoryUnitOfWork {
    async fn lock_reference(&mut self, _tenant_id: TenantId, _reference: &str) -> Result<(), StoreError> {
        // The store lock is already held for the whole unit of work.
        Ok(())
    }

    async fn find_journal(
        &mut self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<Journal>, StoreError> {
        Ok(self.work.journal_by_reference(tenant_id, reference).cloned())
    }

    async fn find_invoice_journal(
        &mut self,
        tenant_id: TenantId,
        normalized_number: &str,
    ) -> Result<Option<Journal>, StoreError> {
        let journal_id = self
            .work
            .invoices
            .values()
            .find(|i| {
                i.tenant_id == tenant_id && i.normalized_number.as_deref() == Some(normalized_number)
            })
            .map(|i| i.journal_id);
        Ok(journal_id.and_then(|id| self.work.journals.iter().find(|j| j.id == id).cloned()))
    }

    async fn load_journal(
        &mut self,
        tenant_id: TenantId,
        journal_id: JournalId,
    ) -> Result<Option<Journal>, StoreError> {
        Ok(self
            .work
            .journals
            .iter()
            .find(|j| j.id == journal_id && j.tenant_id == tenant_id)
            .cloned())
    }

    async fn account_ids(
        &mut self,
        tenant_id: TenantId,
        codes: &[String],
    ) -> Result<HashMap<String, AccountId>, StoreError> {
        let Some(chart) = self.work.charts.get(&tenant_id) else {
            return Ok(HashMap::new());
        };
        Ok(codes
            .iter()
            .filter_map(|code| {
                chart
                    .get(code)
                    .filter(|a| a.is_active)
                    .map(|a| (code.clone(), a.id))
            })
            .collect())
    }

    async fn lock_lots(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<InventoryLot>, StoreError> {
        Ok(self.work.lots_of(tenant_id, product_id))
    }

    async fn update_lots(&mut self, lots: &[InventoryLot]) -> Result<(), StoreError> {
        for lot in lots {
            let stored = self.work.lots.get_mut(&lot.id).ok_or(StoreError::NotFound)?;
            stored.remaining_qty = lot.remaining_qty;
        }
        Ok(())
    }

    async fn insert_lots(&mut self, lots: &[InventoryLot]) -> Result<(), StoreError> {
        for lot in lots {
            self.work.lots.insert(lot.id, lot.clone());
        }
        Ok(())
    }

    async fn insert_inventory_txns(&mut self, txns: &[InventoryTxn]) -> Result<(), StoreError> {
        self.work.inventory_txns.extend_from_slice(txns);
        Ok(())
    }

    async fn insert_journal(&mut self, journal: &Journal) -> Result<(), StoreError> {
        if self
            .work
            .journal_by_reference(journal.tenant_id, &journal.reference)
            .is_some()
        {
            return Err(StoreError::UniqueViolation("journals_tenant_reference_key".into()));
        }
        self.work.journals.push(journal.clone());
        Ok(())
    }

    async fn insert_expense(&mut self, record: &ExpenseRecord) -> Result<(), StoreError> {
        self.work.expenses.insert(record.id, record.clone());
        Ok(())
    }

    async fn insert_invoice(&mut self, record: &InvoiceRecord) -> Result<(), StoreError> {
        let taken = record.normalized_number.as_ref().is_some_and(|number| {
            self.work.invoices.values().any(|i| {
                i.tenant_id == record.tenant_id && i.normalized_number.as_ref() == Some(number)
            })
        });
        if taken {
            return Err(StoreError::UniqueViolation("invoices_tenant_number_key".into()));
        }
        self.work.invoices.insert(record.id, record.clone());
        Ok(())
    }

    async fn load_expense(
        &mut self,
        tenant_id: TenantId,
        expense_id: ExpenseId,
    ) -> Result<Option<ExpenseRecord>, StoreError> {
        Ok(self
            .work
            .expenses
            .get(&expense_id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn load_invoice(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<InvoiceRecord>, StoreError> {
        Ok(self
            .work
            .invoices
            .get(&invoice_id)
            .filter(|r| r.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_expense_settlement(&mut self, record: &ExpenseRecord) -> Result<(), StoreError> {
        let stored = self.work.expenses.get_mut(&record.id).ok_or(StoreError::NotFound)?;
        stored.amount_paid = record.amount_paid;
        stored.status = record.status;
        Ok(())
    }

    async fn update_invoice_settlement(&mut self, record: &InvoiceRecord) -> Result<(), StoreError> {
        let stored = self.work.invoices.get_mut(&record.id).ok_or(StoreError::NotFound)?;
        stored.amount_paid = record.amount_paid;
        stored.status = record.status;
        Ok(())
    }

    async fn load_asset(
        &mut self,
        tenant_id: TenantId,
        asset_id: AssetId,
    ) -> Result<Option<Asset>, StoreError> {
        Ok(self
            .work
            .assets
            .get(&asset_id)
            .filter(|a| a.tenant_id == tenant_id)
            .cloned())
    }

    async fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError> {
        let stored = self.work.assets.get_mut(&asset.id).ok_or(StoreError::NotFound)?;
        stored.accumulated_depreciation = asset.accumulated_depreciation;
        stored.status = asset.status;
        stored.next_run_on = asset.next_run_on;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        Ok(())
    }
}
