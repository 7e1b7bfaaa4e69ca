//! Account resolution: which account a transaction line should hit.
//!
//! Debit-side resolution walks an ordered list of [`ResolveStrategy`]
//! tiers and takes the first answer naming an active account:
//!
//! 1. explicit override
//! 2. deterministic vendor heuristics
//! 3. category key table
//! 4. external classification oracle (optional, time-bounded)
//! 5. keyword table
//!
//! If no tier answers, the catch-all expense account is used, then the
//! secondary default, and only then does resolution fail with
//! `FALLBACK_ACCOUNT_MISSING`. No tier ever raises an error.
//!
//! Credit-side resolution for expenses is a fixed table keyed by payment
//! status.

pub mod bucket;
pub mod heuristics;
pub mod oracle;
pub mod tables;


use std::fmt;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::TenantId;

use crate::chart::{ChartOfAccounts, PostingAccounts};
use crate::ledger::error::PostingError;
use crate::ledger::types::PaymentStatus;

pub use bucket::TokenBucket;
pub use oracle::{ClassificationOracle, ClassificationRequest, OracleError, OracleSettings, OracleStrategy};

/// What is known about a line when choosing its account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountHint {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Logical category key.
    pub category_key: Option<String>,
    /// Vendor name.
    pub vendor: String,
    /// Free-text description.
    pub description: Option<String>,
    /// Account code chosen by a user or a suggestion service.
    pub suggested_account_code: Option<String>,
}

impl AccountHint {
    /// Vendor and description joined for pattern matching.
    #[must_use]
    pub fn text(&self) -> String {
        match &self.description {
            Some(description) => format!("{} {description}", self.vendor),
            None => self.vendor.clone(),
        }
    }
}

/// Which tier produced an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Caller-supplied account code.
    Override,
    /// Vendor pattern family.
    Heuristic,
    /// Category key table.
    Category,
    /// External classification oracle.
    Oracle,
    /// Keyword table.
    Keyword,
    /// Catch-all expense account.
    Fallback,
    /// Secondary default expense account.
    SecondaryFallback,
    /// Credit table keyed by payment status.
    StatusTable,
    /// Negative amount treated as a refund.
    Refund,
    /// Fixed system account (inventory, revenue).
    System,
}

impl ResolutionSource {
    /// Storage name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Heuristic => "heuristic",
            Self::Category => "category",
            Self::Oracle => "oracle",
            Self::Keyword => "keyword",
            Self::Fallback => "fallback",
            Self::SecondaryFallback => "secondary_fallback",
            Self::StatusTable => "status_table",
            Self::Refund => "refund",
            Self::System => "system",
        }
    }
}

impl fmt::Display for ResolutionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chosen account and the tier that chose it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    /// Account code.
    pub account_code: String,
    /// Tier.
    pub source: ResolutionSource,
}

impl Resolution {
    fn new(account_code: &str, source: ResolutionSource) -> Self {
        Self {
            account_code: account_code.to_string(),
            source,
        }
    }
}

/// One tier of debit-side resolution.
#[async_trait]
pub trait ResolveStrategy: Send + Sync {
    /// Tier name for logs.
    fn name(&self) -> &'static str;

    /// Returns an active account of `chart`, or `None` to pass to the next tier.
    async fn try_resolve(&self, hint: &AccountHint, chart: &ChartOfAccounts) -> Option<Resolution>;
}

/// Tier 1: caller-supplied code, honored if it is in the chart.
pub struct OverrideStrategy;

#[async_trait]
impl ResolveStrategy for OverrideStrategy {
    fn name(&self) -> &'static str {
        "override"
    }

    async fn try_resolve(&self, hint: &AccountHint, chart: &ChartOfAccounts) -> Option<Resolution> {
        let code = hint.suggested_account_code.as_deref()?.trim();
        if chart.contains(code) {
            Some(Resolution::new(code, ResolutionSource::Override))
        } else {
            tracing::debug!(account_code = code, "Override is not an active account, ignoring");
            None
        }
    }
}

/// Tier 2: regex vendor families.
pub struct HeuristicStrategy;

#[async_trait]
impl ResolveStrategy for HeuristicStrategy {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    async fn try_resolve(&self, hint: &AccountHint, chart: &ChartOfAccounts) -> Option<Resolution> {
        let family = heuristics::match_family(&hint.text())?;
        chart
            .contains(family.account_code)
            .then(|| Resolution::new(family.account_code, ResolutionSource::Heuristic))
    }
}

/// Tier 3: category key table.
pub struct CategoryStrategy;

#[async_trait]
impl ResolveStrategy for CategoryStrategy {
    fn name(&self) -> &'static str {
        "category"
    }

    async fn try_resolve(&self, hint: &AccountHint, chart: &ChartOfAccounts) -> Option<Resolution> {
        let code = tables::category_account(hint.category_key.as_deref()?)?;
        chart
            .contains(code)
            .then(|| Resolution::new(code, ResolutionSource::Category))
    }
}

/// Tier 5: keyword table.
pub struct KeywordStrategy;

#[async_trait]
impl ResolveStrategy for KeywordStrategy {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn try_resolve(&self, hint: &AccountHint, chart: &ChartOfAccounts) -> Option<Resolution> {
        let category = tables::keyword_category(&hint.text())?;
        let code = tables::category_account(category)?;
        chart
            .contains(code)
            .then(|| Resolution::new(code, ResolutionSource::Keyword))
    }
}

/// Accounts used when every tier passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Catch-all expense account.
    pub primary: String,
    /// Known-good default used when the catch-all is missing.
    pub secondary: String,
}

impl From<&PostingAccounts> for FallbackPolicy {
    fn from(accounts: &PostingAccounts) -> Self {
        Self {
            primary: accounts.fallback_expense.clone(),
            secondary: accounts.secondary_expense.clone(),
        }
    }
}

/// Ordered chain of resolution tiers plus the fallback policy.
pub struct AccountResolver {
    strategies: Vec<Box<dyn ResolveStrategy>>,
    fallback: FallbackPolicy,
}

impl AccountResolver {
    /// A resolver with explicit tiers.
    #[must_use]
    pub fn new(strategies: Vec<Box<dyn ResolveStrategy>>, fallback: FallbackPolicy) -> Self {
        Self {
            strategies,
            fallback,
        }
    }

    /// The standard chain; the oracle tier is included when given.
    #[must_use]
    pub fn standard(accounts: &PostingAccounts, oracle: Option<OracleStrategy>) -> Self {
        let mut strategies: Vec<Box<dyn ResolveStrategy>> = vec![
            Box::new(OverrideStrategy),
            Box::new(HeuristicStrategy),
            Box::new(CategoryStrategy),
        ];
        if let Some(oracle) = oracle {
            strategies.push(Box::new(oracle));
        }
        strategies.push(Box::new(KeywordStrategy));
        Self::new(strategies, FallbackPolicy::from(accounts))
    }

    /// Tier names in evaluation order.
    #[must_use]
    pub fn tiers(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Chooses the debit account for an expense line.
    ///
    /// # Errors
    ///
    /// Returns [`PostingError::FallbackAccountMissing`] only when no tier
    /// answers and neither fallback account is in the chart.
    pub async fn resolve_debit(
        &self,
        hint: &AccountHint,
        chart: &ChartOfAccounts,
    ) -> Result<Resolution, PostingError> {
        for strategy in &self.strategies {
            if let Some(resolution) = strategy.try_resolve(hint, chart).await {
                tracing::debug!(
                    tier = strategy.name(),
                    account_code = %resolution.account_code,
                    "Debit account resolved"
                );
                return Ok(resolution);
            }
        }

        if chart.contains(&self.fallback.primary) {
            tracing::debug!(account_code = %self.fallback.primary, "Debit account fell back to catch-all");
            return Ok(Resolution::new(&self.fallback.primary, ResolutionSource::Fallback));
        }
        if chart.contains(&self.fallback.secondary) {
            tracing::warn!(
                missing = %self.fallback.primary,
                account_code = %self.fallback.secondary,
                "Catch-all account missing, using secondary default"
            );
            return Ok(Resolution::new(
                &self.fallback.secondary,
                ResolutionSource::SecondaryFallback,
            ));
        }
        Err(PostingError::FallbackAccountMissing)
    }
}

/// Chooses the credit account for an expense of `amount` with `status`.
///
/// Negative amounts are refunds and always move cash.
#[must_use]
pub fn resolve_credit(status: PaymentStatus, amount: Decimal, accounts: &PostingAccounts) -> Resolution {
    if amount < Decimal::ZERO {
        return Resolution::new(&accounts.cash, ResolutionSource::Refund);
    }
    let code = match status {
        PaymentStatus::Paid | PaymentStatus::Overpaid | PaymentStatus::Refunded => &accounts.cash,
        PaymentStatus::Unpaid | PaymentStatus::Partial => &accounts.payable,
    };
    Resolution::new(code, ResolutionSource::StatusTable)
}
