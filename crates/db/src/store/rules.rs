//! Postgres implementation of the recurring rule store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
};
use tally_core::ledger::StoreError;
use tally_core::schedule::{RecurringRule, RuleStore, TenantScope};
use tally_shared::types::{RecurringRuleId, TenantId};

use crate::entities::recurring_rules::{self, Column};
use crate::error::store_error;

/// Rule store backed by Postgres.
///
/// [`save`](RuleStore::save) is a compare-and-swap on `next_run_at`, so
/// two workers sweeping the same rule cannot both advance it.
#[derive(Debug, Clone)]
pub struct PgRuleStore {
    db: DatabaseConnection,
}

impl PgRuleStore {
    /// Creates a new store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl RuleStore for PgRuleStore {
    async fn insert(&self, rule: &RecurringRule) -> Result<(), StoreError> {
        recurring_rules::Entity::insert(recurring_rules::ActiveModel::try_from(rule)?)
            .exec_without_returning(&self.db)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn get(&self, id: RecurringRuleId) -> Result<Option<RecurringRule>, StoreError> {
        recurring_rules::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .map(recurring_rules::Model::into_rule)
            .transpose()
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<RecurringRule>, StoreError> {
        recurring_rules::Entity::find()
            .filter(Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(recurring_rules::Model::into_rule)
            .collect()
    }

    async fn candidates(
        &self,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecurringRule>, StoreError> {
        let due = Condition::all()
            .add(Column::IsActive.eq(true))
            .add(Column::NextRunAt.lte(now.fixed_offset()));
        let resumable = Condition::all()
            .add(Column::IsActive.eq(false))
            .add(Expr::cust("(options->>'resume_on') IS NOT NULL"));
        let mut query = recurring_rules::Entity::find().filter(Condition::any().add(due).add(resumable));
        if let TenantScope::Tenant(tenant_id) = scope {
            query = query.filter(Column::TenantId.eq(tenant_id.into_inner()));
        }
        query
            .order_by_asc(Column::NextRunAt)
            .order_by_asc(Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(recurring_rules::Model::into_rule)
            .collect()
    }

    async fn save(&self, rule: &RecurringRule, expected: DateTime<Utc>) -> Result<(), StoreError> {
        let result = recurring_rules::Entity::update_many()
            .set(recurring_rules::ActiveModel::try_from(rule)?)
            .filter(Column::Id.eq(rule.id.into_inner()))
            .filter(Column::NextRunAt.eq(expected.fixed_offset()))
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        if result.rows_affected > 0 {
            return Ok(());
        }
        // Nothing matched: either the rule is gone or another writer moved it.
        let exists = recurring_rules::Entity::find_by_id(rule.id.into_inner())
            .one(&self.db)
            .await
            .map_err(store_error)?
            .is_some();
        if exists {
            tracing::debug!(rule_id = %rule.id, "Rule moved by a concurrent writer");
            Err(StoreError::Conflict)
        } else {
            Err(StoreError::NotFound)
        }
    }

    async fn delete(&self, id: RecurringRuleId) -> Result<bool, StoreError> {
        let result = recurring_rules::Entity::delete_by_id(id.into_inner())
            .exec(&self.db)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }
}
