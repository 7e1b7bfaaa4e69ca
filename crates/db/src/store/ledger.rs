//! Postgres implementation of the ledger and asset stores.
//!
//! A unit of work is one database transaction. Reference locks are
//! transaction-scoped advisory locks; lots, records and assets are read
//! with `SELECT ... FOR UPDATE` so concurrent writers queue behind each other.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Statement, TransactionTrait,
};
use tally_core::chart::{ChartOfAccounts, TenantProfile};
use tally_core::depreciation::{Asset, AssetStatus, AssetStore};
use tally_core::inventory::{InventoryLot, InventoryTxn};
use tally_core::ledger::{
    ExpenseRecord, InvoiceRecord, Journal, LedgerStore, LedgerUnitOfWork, StoreError,
};
use tally_shared::types::{AccountId, AssetId, ExpenseId, InvoiceId, JournalId, ProductId, TenantId};

use crate::entities::{
    accounts, assets, expenses, inventory_lots, inventory_txns, invoices, journals, ledger_entries,
    tenant_profiles,
};
use crate::error::store_error;

/// Ledger store backed by Postgres.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
}

impl PgLedgerStore {
    /// Creates a new store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn chart(&self, tenant_id: TenantId) -> Result<Arc<ChartOfAccounts>, StoreError> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        let accounts = rows
            .into_iter()
            .map(accounts::Model::into_account)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Arc::new(ChartOfAccounts::new(accounts)))
    }

    async fn tenant_profile(&self, tenant_id: TenantId) -> Result<TenantProfile, StoreError> {
        tenant_profiles::Entity::find_by_id(tenant_id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map_or_else(
                || Ok(TenantProfile::default_for(tenant_id)),
                tenant_profiles::Model::into_profile,
            )
    }

    async fn find_journal(
        &self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<Journal>, StoreError> {
        journal_where(&self.db, by_reference(tenant_id, reference)).await
    }

    async fn lots(
        &self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<InventoryLot>, StoreError> {
        let rows = fifo_lots(tenant_id, product_id)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(InventoryLot::from).collect())
    }

    async fn begin(&self) -> Result<Box<dyn LedgerUnitOfWork>, StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(Box::new(PgUnitOfWork { txn }))
    }
}

#[async_trait]
impl AssetStore for PgLedgerStore {
    async fn due_assets(&self, today: NaiveDate, limit: usize) -> Result<Vec<Asset>, StoreError> {
        let rows = assets::Entity::find()
            .filter(assets::Column::Status.eq(AssetStatus::Active.as_str()))
            .filter(assets::Column::NextRunOn.lte(today))
            .order_by_asc(assets::Column::NextRunOn)
            .order_by_asc(assets::Column::Id)
            .limit(u64::try_from(limit).unwrap_or(u64::MAX))
            .all(&self.db)
            .await
            .map_err(store_error)?;
        rows.into_iter().map(assets::Model::into_asset).collect()
    }

    async fn mark_fully_depreciated(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
    ) -> Result<(), StoreError> {
        let result = assets::Entity::update_many()
            .col_expr(
                assets::Column::Status,
                Expr::value(AssetStatus::FullyDepreciated.as_str()),
            )
            .col_expr(assets::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(assets::Column::Id.eq(asset_id.into_inner()))
            .filter(assets::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        found(result.rows_affected)
    }
}

/// One Postgres transaction.
pub struct PgUnitOfWork {
    txn: DatabaseTransaction,
}

#[async_trait]
impl LedgerUnitOfWork for PgUnitOfWork {
    async fn lock_reference(&mut self, tenant_id: TenantId, reference: &str) -> Result<(), StoreError> {
        let key = format!("{tenant_id}:{reference}");
        self.txn
            .execute(Statement::from_sql_and_values(
                DbBackend::Postgres,
                "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
                [key.into()],
            ))
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn find_journal(
        &mut self,
        tenant_id: TenantId,
        reference: &str,
    ) -> Result<Option<Journal>, StoreError> {
        journal_where(&self.txn, by_reference(tenant_id, reference)).await
    }

    async fn find_invoice_journal(
        &mut self,
        tenant_id: TenantId,
        normalized_number: &str,
    ) -> Result<Option<Journal>, StoreError> {
        let invoice = invoices::Entity::find()
            .filter(invoices::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(invoices::Column::NormalizedNumber.eq(normalized_number))
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        match invoice {
            Some(invoice) => {
                let filter = Condition::all().add(journals::Column::Id.eq(invoice.journal_id));
                journal_where(&self.txn, filter).await
            }
            None => Ok(None),
        }
    }

    async fn load_journal(
        &mut self,
        tenant_id: TenantId,
        journal_id: JournalId,
    ) -> Result<Option<Journal>, StoreError> {
        let filter = Condition::all()
            .add(journals::Column::Id.eq(journal_id.into_inner()))
            .add(journals::Column::TenantId.eq(tenant_id.into_inner()));
        journal_where(&self.txn, filter).await
    }

    async fn account_ids(
        &mut self,
        tenant_id: TenantId,
        codes: &[String],
    ) -> Result<HashMap<String, AccountId>, StoreError> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::Code.is_in(codes.iter().cloned()))
            .filter(accounts::Column::IsActive.eq(true))
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows
            .into_iter()
            .map(|row| (row.code, AccountId::from_uuid(row.id)))
            .collect())
    }

    async fn lock_lots(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
    ) -> Result<Vec<InventoryLot>, StoreError> {
        let rows = fifo_lots(tenant_id, product_id)
            .lock_exclusive()
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(InventoryLot::from).collect())
    }

    async fn update_lots(&mut self, lots: &[InventoryLot]) -> Result<(), StoreError> {
        for lot in lots {
            let result = inventory_lots::Entity::update_many()
                .col_expr(inventory_lots::Column::RemainingQty, Expr::value(lot.remaining_qty))
                .filter(inventory_lots::Column::Id.eq(lot.id.into_inner()))
                .exec(&self.txn)
                .await
                .map_err(store_error)?;
            found(result.rows_affected)?;
        }
        Ok(())
    }

    async fn insert_lots(&mut self, lots: &[InventoryLot]) -> Result<(), StoreError> {
        if lots.is_empty() {
            return Ok(());
        }
        inventory_lots::Entity::insert_many(lots.iter().map(inventory_lots::ActiveModel::from))
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_inventory_txns(&mut self, txns: &[InventoryTxn]) -> Result<(), StoreError> {
        if txns.is_empty() {
            return Ok(());
        }
        inventory_txns::Entity::insert_many(txns.iter().map(inventory_txns::ActiveModel::from))
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_journal(&mut self, journal: &Journal) -> Result<(), StoreError> {
        journals::Entity::insert(journals::ActiveModel::try_from(journal)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;

        let created_at = journal.created_at.fixed_offset();
        let mut lines = Vec::with_capacity(journal.entries.len());
        for (line_no, entry) in (1_i32..).zip(&journal.entries) {
            lines.push(ledger_entries::Model::active(
                journal.tenant_id,
                line_no,
                entry,
                created_at,
            ));
        }
        if !lines.is_empty() {
            ledger_entries::Entity::insert_many(lines)
                .exec_without_returning(&self.txn)
                .await
                .map_err(store_error)?;
        }
        Ok(())
    }

    async fn insert_expense(&mut self, record: &ExpenseRecord) -> Result<(), StoreError> {
        expenses::Entity::insert(expenses::ActiveModel::try_from(record)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn insert_invoice(&mut self, record: &InvoiceRecord) -> Result<(), StoreError> {
        invoices::Entity::insert(invoices::ActiveModel::try_from(record)?)
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn load_expense(
        &mut self,
        tenant_id: TenantId,
        expense_id: ExpenseId,
    ) -> Result<Option<ExpenseRecord>, StoreError> {
        expenses::Entity::find_by_id(expense_id.into_inner())
            .filter(expenses::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(expenses::Model::into_record)
            .transpose()
    }

    async fn load_invoice(
        &mut self,
        tenant_id: TenantId,
        invoice_id: InvoiceId,
    ) -> Result<Option<InvoiceRecord>, StoreError> {
        invoices::Entity::find_by_id(invoice_id.into_inner())
            .filter(invoices::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(invoices::Model::into_record)
            .transpose()
    }

    async fn update_expense_settlement(&mut self, record: &ExpenseRecord) -> Result<(), StoreError> {
        let result = expenses::Entity::update_many()
            .col_expr(expenses::Column::AmountPaid, Expr::value(record.amount_paid))
            .col_expr(expenses::Column::Status, Expr::value(record.status.as_str()))
            .col_expr(expenses::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(expenses::Column::Id.eq(record.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        found(result.rows_affected)
    }

    async fn update_invoice_settlement(&mut self, record: &InvoiceRecord) -> Result<(), StoreError> {
        let result = invoices::Entity::update_many()
            .col_expr(invoices::Column::AmountPaid, Expr::value(record.amount_paid))
            .col_expr(invoices::Column::Status, Expr::value(record.status.as_str()))
            .col_expr(invoices::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(invoices::Column::Id.eq(record.id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        found(result.rows_affected)
    }

    async fn load_asset(
        &mut self,
        tenant_id: TenantId,
        asset_id: AssetId,
    ) -> Result<Option<Asset>, StoreError> {
        assets::Entity::find_by_id(asset_id.into_inner())
            .filter(assets::Column::TenantId.eq(tenant_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(assets::Model::into_asset)
            .transpose()
    }

    async fn update_asset(&mut self, asset: &Asset) -> Result<(), StoreError> {
        let result = assets::Entity::update_many()
            .col_expr(
                assets::Column::AccumulatedDepreciation,
                Expr::value(asset.accumulated_depreciation),
            )
            .col_expr(assets::Column::Status, Expr::value(asset.status.as_str()))
            .col_expr(assets::Column::NextRunOn, Expr::value(asset.next_run_on))
            .col_expr(assets::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(assets::Column::Id.eq(asset.id.into_inner()))
            .filter(assets::Column::TenantId.eq(asset.tenant_id.into_inner()))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        found(result.rows_affected)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(store_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(store_error)
    }
}

fn by_reference(tenant_id: TenantId, reference: &str) -> Condition {
    Condition::all()
        .add(journals::Column::TenantId.eq(tenant_id.into_inner()))
        .add(journals::Column::Reference.eq(reference))
}

fn fifo_lots(tenant_id: TenantId, product_id: ProductId) -> sea_orm::Select<inventory_lots::Entity> {
    inventory_lots::Entity::find()
        .filter(inventory_lots::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(inventory_lots::Column::ProductId.eq(product_id.into_inner()))
        .order_by_asc(inventory_lots::Column::ReceivedOn)
        .order_by_asc(inventory_lots::Column::ReceivedAt)
        .order_by_asc(inventory_lots::Column::Id)
}

/// Loads one journal header matching `filter` together with its entries.
async fn journal_where<C>(conn: &C, filter: Condition) -> Result<Option<Journal>, StoreError>
where
    C: ConnectionTrait,
{
    let Some(header) = journals::Entity::find()
        .filter(filter)
        .one(conn)
        .await
        .map_err(store_error)?
    else {
        return Ok(None);
    };
    let entries = ledger_entries::Entity::find()
        .filter(ledger_entries::Column::JournalId.eq(header.id))
        .order_by_asc(ledger_entries::Column::LineNo)
        .all(conn)
        .await
        .map_err(store_error)?;
    header.into_journal(entries).map(Some)
}

fn found(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}
