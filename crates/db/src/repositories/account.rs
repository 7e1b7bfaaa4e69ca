//! Account repository for chart of accounts maintenance.

use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use tally_core::chart::{Account, AccountType, standard_chart};
use tally_core::ledger::StoreError;
use tally_shared::types::{AccountId, TenantId};
use uuid::Uuid;

use crate::entities::{accounts, ledger_entries};

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account code already exists for the tenant.
    #[error("Account code '{0}' already exists")]
    DuplicateCode(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Cannot delete account because it has ledger entries.
    #[error("Cannot delete account: account has {0} ledger entries")]
    CannotDeleteWithEntries(u64),

    /// A stored row could not be read back.
    #[error(transparent)]
    Corrupt(#[from] StoreError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Account code (unique within the tenant).
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type; decides the normal balance.
    pub account_type: AccountType,
    /// Parent account code.
    pub parent_code: Option<String>,
}

/// Account repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Seeds the standard chart for a tenant.
    ///
    /// Codes the tenant already has are left untouched, so seeding twice
    /// is a no-op. Returns the number of accounts inserted.
    pub async fn seed_standard_chart(&self, tenant_id: TenantId) -> Result<u64, AccountError> {
        let accounts = standard_chart(tenant_id);
        let inserted = accounts::Entity::insert_many(accounts.iter().map(accounts::ActiveModel::from))
            .on_conflict(
                OnConflict::columns([accounts::Column::TenantId, accounts::Column::Code])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        tracing::info!(%tenant_id, inserted, total = accounts.len(), "Seeded standard chart");
        Ok(inserted)
    }

    /// Creates a new account.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<Account, AccountError> {
        let existing = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(input.tenant_id.into_inner()))
            .filter(accounts::Column::Code.eq(&input.code))
            .one(&self.db)
            .await?;
        if existing.is_some() {
            return Err(AccountError::DuplicateCode(input.code));
        }

        let mut account = Account::new(input.tenant_id, &input.code, &input.name, input.account_type);
        account.parent_code = input.parent_code;
        let model = accounts::ActiveModel::from(&account).insert(&self.db).await?;
        Ok(model.into_account()?)
    }

    /// Lists a tenant's accounts by code.
    pub async fn list_accounts(
        &self,
        tenant_id: TenantId,
        include_inactive: bool,
    ) -> Result<Vec<Account>, AccountError> {
        let mut query = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Code);
        if !include_inactive {
            query = query.filter(accounts::Column::IsActive.eq(true));
        }
        let rows = query.all(&self.db).await?;
        Ok(rows
            .into_iter()
            .map(accounts::Model::into_account)
            .collect::<Result<Vec<_>, _>>()?)
    }

    /// Renames an account. The code is immutable.
    pub async fn rename_account(
        &self,
        tenant_id: TenantId,
        id: AccountId,
        name: &str,
    ) -> Result<Account, AccountError> {
        let model = self.find(tenant_id, id).await?;
        let mut active: accounts::ActiveModel = model.into();
        active.name = Set(name.to_string());
        active.updated_at = Set(Utc::now().fixed_offset());
        Ok(active.update(&self.db).await?.into_account()?)
    }

    /// Deactivates an account. Its history stays; new postings to it fail.
    pub async fn deactivate_account(&self, tenant_id: TenantId, id: AccountId) -> Result<(), AccountError> {
        let result = accounts::Entity::update_many()
            .col_expr(accounts::Column::IsActive, Expr::value(false))
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now().fixed_offset()))
            .filter(accounts::Column::Id.eq(id.into_inner()))
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(AccountError::AccountNotFound(id.into_inner()));
        }
        Ok(())
    }

    /// Deletes an account that has never been posted to.
    pub async fn delete_account(&self, tenant_id: TenantId, id: AccountId) -> Result<(), AccountError> {
        let txn = self.db.begin().await?;

        let model = accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&txn)
            .await?
            .ok_or(AccountError::AccountNotFound(id.into_inner()))?;

        let entry_count = ledger_entries::Entity::find()
            .filter(ledger_entries::Column::AccountId.eq(model.id))
            .count(&txn)
            .await?;
        if entry_count > 0 {
            return Err(AccountError::CannotDeleteWithEntries(entry_count));
        }

        accounts::Entity::delete_by_id(model.id).exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    async fn find(&self, tenant_id: TenantId, id: AccountId) -> Result<accounts::Model, AccountError> {
        accounts::Entity::find_by_id(id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await?
            .ok_or(AccountError::AccountNotFound(id.into_inner()))
    }
}
