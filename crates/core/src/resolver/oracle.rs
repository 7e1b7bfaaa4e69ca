//! External classification oracle tier.
//!
//! The oracle sees the tenant's chart and a description and answers with
//! strict JSON `{"accountCode": "...", "reason": "..."}`. Every failure
//! (rate limit, timeout, transport error, malformed JSON, unknown code)
//! yields no suggestion and resolution moves on to the next tier.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use tally_shared::types::TenantId;
use thiserror::Error;

use super::bucket::TokenBucket;
use super::tables::word_text;
use super::{AccountHint, Resolution, ResolutionSource, ResolveStrategy};
use crate::chart::ChartOfAccounts;

/// Oracle transport failures.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The request could not be sent or the response not read.
    #[error("Oracle transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Oracle returned HTTP {0}")]
    Status(u16),
}

/// An account offered to the oracle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleAccount {
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Account type.
    pub account_type: String,
}

/// What the oracle is asked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationRequest {
    /// Tenant the chart belongs to.
    pub tenant_id: TenantId,
    /// Vendor and description text.
    pub description: String,
    /// Active accounts to choose from.
    pub accounts: Vec<OracleAccount>,
}

impl ClassificationRequest {
    fn new(tenant_id: TenantId, description: String, chart: &ChartOfAccounts) -> Self {
        let accounts = chart
            .accounts()
            .iter()
            .filter(|a| a.is_active)
            .map(|a| OracleAccount {
                code: a.code.clone(),
                name: a.name.clone(),
                account_type: a.account_type.as_str().to_string(),
            })
            .collect();
        Self {
            tenant_id,
            description,
            accounts,
        }
    }
}

/// The only accepted answer shape.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct OracleAnswer {
    /// Suggested account code.
    pub account_code: String,
    /// Short justification.
    pub reason: String,
}

/// Parses a raw oracle answer, rejecting any other shape.
#[must_use]
pub fn parse_answer(raw: &str) -> Option<OracleAnswer> {
    serde_json::from_str::<OracleAnswer>(raw.trim())
        .ok()
        .filter(|a| !a.account_code.trim().is_empty())
}

/// A classification service returning raw answer text.
#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Asks for the best account code for a description.
    async fn classify(&self, request: &ClassificationRequest) -> Result<String, OracleError>;
}

/// Limits for the oracle tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleSettings {
    /// Hard timeout of one call.
    pub timeout: Duration,
    /// Sustained request rate.
    pub requests_per_minute: u32,
    /// Token bucket capacity.
    pub burst: u32,
    /// Cached answer lifetime.
    pub cache_ttl: Duration,
    /// Cached answer capacity.
    pub cache_capacity: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2500),
            requests_per_minute: 30,
            burst: 5,
            cache_ttl: Duration::from_secs(3600),
            cache_capacity: 1000,
        }
    }
}

impl From<&tally_shared::config::ClassifierConfig> for OracleSettings {
    fn from(config: &tally_shared::config::ClassifierConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            requests_per_minute: config.requests_per_minute,
            burst: config.burst,
            cache_ttl: Duration::from_secs(config.cache_ttl_secs),
            cache_capacity: config.cache_capacity,
        }
    }
}

/// Oracle resolution tier with its own rate limiter and answer cache.
pub struct OracleStrategy {
    oracle: Arc<dyn ClassificationOracle>,
    bucket: TokenBucket,
    cache: Cache<(TenantId, String), String>,
    timeout: Duration,
}

impl OracleStrategy {
    /// Creates the tier around an oracle client.
    #[must_use]
    pub fn new(oracle: Arc<dyn ClassificationOracle>, settings: OracleSettings) -> Self {
        Self {
            oracle,
            bucket: TokenBucket::new(settings.burst, settings.requests_per_minute),
            cache: Cache::builder()
                .max_capacity(settings.cache_capacity)
                .time_to_live(settings.cache_ttl)
                .build(),
            timeout: settings.timeout,
        }
    }

    fn accept(code: String, chart: &ChartOfAccounts) -> Option<Resolution> {
        chart.contains(&code).then_some(Resolution {
            account_code: code,
            source: ResolutionSource::Oracle,
        })
    }
}

#[async_trait]
impl ResolveStrategy for OracleStrategy {
    fn name(&self) -> &'static str {
        "oracle"
    }

    async fn try_resolve(&self, hint: &AccountHint, chart: &ChartOfAccounts) -> Option<Resolution> {
        let text = word_text(&hint.text()).trim().to_string();
        if text.is_empty() {
            return None;
        }
        let key = (hint.tenant_id, text.clone());

        if let Some(code) = self.cache.get(&key) {
            tracing::debug!(account_code = %code, "Oracle answer served from cache");
            return Self::accept(code, chart);
        }

        if !self.bucket.try_acquire() {
            tracing::debug!("Oracle rate limit reached, skipping tier");
            return None;
        }

        let request = ClassificationRequest::new(hint.tenant_id, hint.text(), chart);
        let raw = match tokio::time::timeout(self.timeout, self.oracle.classify(&request)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Oracle call failed");
                return None;
            }
            Err(_) => {
                tracing::warn!(timeout = ?self.timeout, "Oracle call timed out");
                return None;
            }
        };

        let Some(answer) = parse_answer(&raw) else {
            tracing::warn!("Oracle answer did not match the expected shape");
            return None;
        };
        if !chart.contains(&answer.account_code) {
            tracing::warn!(
                account_code = %answer.account_code,
                "Oracle suggested an account outside the chart"
            );
            return None;
        }

        tracing::debug!(account_code = %answer.account_code, reason = %answer.reason, "Oracle suggestion accepted");
        self.cache.insert(key, answer.account_code.clone());
        Self::accept(answer.account_code, chart)
    }
}
