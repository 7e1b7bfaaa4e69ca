//! Rule persistence seam and its in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tally_shared::types::{RecurringRuleId, TenantId};
use tokio::sync::Mutex;

use super::rule::RecurringRule;
use crate::ledger::error::StoreError;

/// Which tenants a sweep covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantScope {
    /// Every tenant (background timer).
    All,
    /// A single tenant (API trigger).
    Tenant(TenantId),
}

impl TenantScope {
    /// Returns true if the scope covers `tenant_id`.
    #[must_use]
    pub fn covers(self, tenant_id: TenantId) -> bool {
        match self {
            Self::All => true,
            Self::Tenant(id) => id == tenant_id,
        }
    }
}

/// Recurring rule storage.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Inserts a new rule.
    async fn insert(&self, rule: &RecurringRule) -> Result<(), StoreError>;

    /// Loads a rule.
    async fn get(&self, id: RecurringRuleId) -> Result<Option<RecurringRule>, StoreError>;

    /// Rules of a tenant, by creation.
    async fn list(&self, tenant_id: TenantId) -> Result<Vec<RecurringRule>, StoreError>;

    /// Rules a sweep must look at: active rules with `next_run_at <= now`,
    /// plus inactive rules carrying a `resume_on` date.
    async fn candidates(
        &self,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecurringRule>, StoreError>;

    /// Replaces a rule if its stored `next_run_at` still equals `expected`.
    ///
    /// Returns [`StoreError::Conflict`] when another writer moved it first.
    async fn save(&self, rule: &RecurringRule, expected: DateTime<Utc>) -> Result<(), StoreError>;

    /// Deletes a rule. Returns false if it did not exist.
    async fn delete(&self, id: RecurringRuleId) -> Result<bool, StoreError>;
}

/// In-memory [`RuleStore`] for tests and single-process use.
#[derive(Debug, Clone, Default)]
pub struct MemoryRuleStore {
    rules: Arc<Mutex<HashMap<RecurringRuleId, RecurringRule>>>,
}

impl MemoryRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn insert(&self, rule: &RecurringRule) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().await;
        if rules.contains_key(&rule.id) {
            return Err(StoreError::UniqueViolation("recurring_rules_pkey".into()));
        }
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn get(&self, id: RecurringRuleId) -> Result<Option<RecurringRule>, StoreError> {
        Ok(self.rules.lock().await.get(&id).cloned())
    }

    async fn list(&self, tenant_id: TenantId) -> Result<Vec<RecurringRule>, StoreError> {
        let mut found: Vec<RecurringRule> = self
            .rules
            .lock()
            .await
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }

    async fn candidates(
        &self,
        scope: TenantScope,
        now: DateTime<Utc>,
    ) -> Result<Vec<RecurringRule>, StoreError> {
        let mut found: Vec<RecurringRule> = self
            .rules
            .lock()
            .await
            .values()
            .filter(|r| scope.covers(r.tenant_id))
            .filter(|r| {
                if r.is_active {
                    r.next_run_at <= now
                } else {
                    r.options.resume_on.is_some()
                }
            })
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.next_run_at, r.id));
        Ok(found)
    }

    async fn save(&self, rule: &RecurringRule, expected: DateTime<Utc>) -> Result<(), StoreError> {
        let mut rules = self.rules.lock().await;
        let stored = rules.get_mut(&rule.id).ok_or(StoreError::NotFound)?;
        if stored.next_run_at != expected {
            return Err(StoreError::Conflict);
        }
        *stored = rule.clone();
        Ok(())
    }

    async fn delete(&self, id: RecurringRuleId) -> Result<bool, StoreError> {
        Ok(self.rules.lock().await.remove(&id).is_some())
    }
}
