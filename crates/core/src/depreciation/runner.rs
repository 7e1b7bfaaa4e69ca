//! Batch job posting the monthly charge of every due asset.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;
use tally_shared::types::{AssetId, TenantId};

use super::Asset;
use crate::calendar::YearMonth;
use crate::ledger::error::StoreError;
use crate::ledger::writer::LedgerWriter;
use crate::posting::events::{AssetDepreciation, PostingEvent};

/// Asset reads and terminal updates outside the ledger writer.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Active assets with `next_run_on <= today`, oldest schedule first.
    async fn due_assets(&self, today: NaiveDate, limit: usize) -> Result<Vec<Asset>, StoreError>;

    /// Moves an asset to its terminal state without posting.
    async fn mark_fully_depreciated(
        &self,
        tenant_id: TenantId,
        asset_id: AssetId,
    ) -> Result<(), StoreError>;
}

/// What one run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DepreciationReport {
    /// Charges posted.
    pub posted: usize,
    /// Charges already posted for the period.
    pub already_posted: usize,
    /// Assets moved to fully depreciated without a charge.
    pub completed: usize,
    /// Assets that failed; the batch went on.
    pub failed: usize,
}

/// Walks due assets and feeds the ledger writer.
pub struct DepreciationRunner {
    assets: Arc<dyn AssetStore>,
    writer: Arc<LedgerWriter>,
}

impl DepreciationRunner {
    /// Creates a runner.
    #[must_use]
    pub fn new(assets: Arc<dyn AssetStore>, writer: Arc<LedgerWriter>) -> Self {
        Self { assets, writer }
    }

    /// Posts at most `limit` due charges as of `today`.
    ///
    /// The charge, the asset update and the journal commit together in
    /// the writer. One asset failing does not stop the others.
    ///
    /// # Errors
    ///
    /// Returns an error only when the due list cannot be read.
    #[tracing::instrument(skip(self))]
    pub async fn run_due(&self, limit: usize, today: NaiveDate) -> Result<DepreciationReport, StoreError> {
        let due = self.assets.due_assets(today, limit).await?;
        let mut report = DepreciationReport::default();

        for asset in due {
            if asset.is_exhausted() {
                match self.assets.mark_fully_depreciated(asset.tenant_id, asset.id).await {
                    Ok(()) => {
                        tracing::info!(asset_id = %asset.id, "Asset fully depreciated");
                        report.completed += 1;
                    }
                    Err(e) => {
                        tracing::warn!(asset_id = %asset.id, error = %e, "Could not close asset");
                        report.failed += 1;
                    }
                }
                continue;
            }

            let event = AssetDepreciation {
                tenant_id: asset.tenant_id,
                asset_id: asset.id,
                period: YearMonth::of(asset.next_run_on),
            };
            match self.writer.post(PostingEvent::AssetDepreciation(event)).await {
                Ok(result) if result.is_existing => report.already_posted += 1,
                Ok(_) => report.posted += 1,
                Err(e) => {
                    tracing::warn!(
                        asset_id = %asset.id,
                        error = %e,
                        code = e.error_code(),
                        "Depreciation failed"
                    );
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            posted = report.posted,
            already_posted = report.already_posted,
            completed = report.completed,
            failed = report.failed,
            "Depreciation run finished"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::PostingAccounts;
    use crate::depreciation::{AssetStatus, DepreciationMethod};
    use crate::ledger::{MemoryLedgerStore, PostingError};
    use crate::resolver::AccountResolver;
    use chrono::Datelike;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn asset(tenant_id: TenantId, accumulated: Decimal, next_run_on: NaiveDate) -> Asset {
        Asset {
            id: AssetId::new(),
            tenant_id,
            name: "Server rack".into(),
            category: None,
            cost: dec!(3600),
            residual_value: dec!(600),
            useful_life_months: 30,
            method: DepreciationMethod::StraightLine,
            accumulated_depreciation: accumulated,
            status: AssetStatus::Active,
            next_run_on,
            schedule_day: next_run_on.day(),
        }
    }

    async fn runner(tenant: TenantId) -> (MemoryLedgerStore, DepreciationRunner) {
        let store = MemoryLedgerStore::with_standard_chart(tenant).await;
        let accounts = PostingAccounts::default();
        let resolver = Arc::new(AccountResolver::standard(&accounts, None));
        let writer = Arc::new(LedgerWriter::new(Arc::new(store.clone()), resolver, accounts));
        let runner = DepreciationRunner::new(Arc::new(store.clone()), writer);
        (store, runner)
    }

    #[tokio::test]
    async fn test_run_due_posts_and_skips_future_assets() {
        let tenant = TenantId::new();
        let (store, runner) = runner(tenant).await;
        let due = asset(tenant, Decimal::ZERO, date(2025, 3, 15));
        let later = asset(tenant, Decimal::ZERO, date(2025, 4, 15));
        store.seed_asset(due.clone()).await;
        store.seed_asset(later.clone()).await;

        let report = runner.run_due(10, date(2025, 3, 31)).await.unwrap();

        assert_eq!(report.posted, 1);
        assert_eq!(report.failed, 0);
        let stored = store.asset(due.id).await.unwrap();
        assert_eq!(stored.accumulated_depreciation, dec!(100));
        assert_eq!(stored.next_run_on, date(2025, 4, 15));
        assert_eq!(store.asset(later.id).await.unwrap().accumulated_depreciation, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_catch_up_runs_one_period_per_call() {
        let tenant = TenantId::new();
        let (store, runner) = runner(tenant).await;
        let behind = asset(tenant, Decimal::ZERO, date(2025, 1, 31));
        store.seed_asset(behind.clone()).await;

        for _ in 0..3 {
            runner.run_due(10, date(2025, 3, 31)).await.unwrap();
        }

        let stored = store.asset(behind.id).await.unwrap();
        assert_eq!(stored.accumulated_depreciation, dec!(300));
        assert_eq!(stored.next_run_on, date(2025, 4, 30));
        let journals = store.journals(tenant).await;
        let references: Vec<&str> = journals.iter().map(|j| j.reference.as_str()).collect();
        assert_eq!(
            references,
            vec![
                format!("depreciation:{}:2025-01", behind.id),
                format!("depreciation:{}:2025-02", behind.id),
                format!("depreciation:{}:2025-03", behind.id),
            ]
        );
    }

    #[tokio::test]
    async fn test_out_of_order_period_is_rejected_and_schedule_continues() {
        let tenant = TenantId::new();
        let (store, runner) = runner(tenant).await;
        let accounts = PostingAccounts::default();
        let resolver = Arc::new(AccountResolver::standard(&accounts, None));
        let writer = LedgerWriter::new(Arc::new(store.clone()), resolver, accounts);
        let rack = asset(tenant, Decimal::ZERO, date(2025, 1, 15));
        store.seed_asset(rack.clone()).await;
        let event = |month| {
            PostingEvent::AssetDepreciation(AssetDepreciation {
                tenant_id: tenant,
                asset_id: rack.id,
                period: YearMonth::new(2025, month).unwrap(),
            })
        };

        let err = writer.post(event(3)).await.unwrap_err();
        let PostingError::Validation(fields) = err else {
            panic!("expected a validation error");
        };
        assert_eq!(fields[0].field, "period");
        assert_eq!(store.asset(rack.id).await.unwrap(), rack);
        assert!(store.journals(tenant).await.is_empty());

        for _ in 0..4 {
            let report = runner.run_due(10, date(2025, 6, 30)).await.unwrap();
            assert_eq!(report.posted, 1);
        }
        let stored = store.asset(rack.id).await.unwrap();
        assert_eq!(stored.accumulated_depreciation, dec!(400));
        assert_eq!(stored.next_run_on, date(2025, 5, 15));

        // A genuine replay of a posted month still returns its journal.
        let replay = writer.post(event(1)).await.unwrap();
        assert!(replay.is_existing);
        assert_eq!(replay.reference, format!("depreciation:{}:2025-01", rack.id));
    }

    #[tokio::test]
    async fn test_exhausted_asset_is_closed_without_posting() {
        let tenant = TenantId::new();
        let (store, runner) = runner(tenant).await;
        let done = asset(tenant, dec!(2999.995), date(2025, 3, 1));
        store.seed_asset(done.clone()).await;

        let report = runner.run_due(10, date(2025, 3, 31)).await.unwrap();

        assert_eq!(report.completed, 1);
        assert_eq!(report.posted, 0);
        assert!(store.journals(tenant).await.is_empty());
        assert_eq!(store.asset(done.id).await.unwrap().status, AssetStatus::FullyDepreciated);
        // Terminal: never due again.
        assert_eq!(runner.run_due(10, date(2025, 12, 31)).await.unwrap(), DepreciationReport::default());
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_the_batch() {
        let tenant = TenantId::new();
        let (store, runner) = runner(tenant).await;
        // No chart for this tenant: its posting fails.
        let orphan = asset(TenantId::new(), Decimal::ZERO, date(2025, 3, 1));
        let ok = asset(tenant, Decimal::ZERO, date(2025, 3, 2));
        store.seed_asset(orphan).await;
        store.seed_asset(ok.clone()).await;

        let report = runner.run_due(10, date(2025, 3, 31)).await.unwrap();

        assert_eq!(report.failed, 1);
        assert_eq!(report.posted, 1);
        assert_eq!(store.asset(ok.id).await.unwrap().accumulated_depreciation, dec!(100));
    }
}
