//! Tally background worker.
//!
//! Runs the recurring-rule sweep and the depreciation batch on timers
//! against Postgres until interrupted.

mod oracle;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tally_core::chart::PostingAccounts;
use tally_core::depreciation::DepreciationRunner;
use tally_core::ledger::LedgerWriter;
use tally_core::resolver::{AccountResolver, OracleSettings, OracleStrategy};
use tally_core::schedule::{RecurringScheduler, SchedulerSettings};
use tally_db::{PgLedgerStore, PgRuleStore};
use tally_shared::AppConfig;
use tally_shared::config::DepreciationConfig;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::oracle::HttpClassificationOracle;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = tally_db::connect_with(&config.database).await?;
    info!("Connected to database");

    // Resolver, with the oracle tier when an endpoint is configured
    let accounts = PostingAccounts::default();
    let oracle = HttpClassificationOracle::from_config(&config.classifier)?.map(|client| {
        info!(model = %config.classifier.model, "Classification oracle enabled");
        OracleStrategy::new(Arc::new(client), OracleSettings::from(&config.classifier))
    });
    let resolver = Arc::new(AccountResolver::standard(&accounts, oracle));
    info!(tiers = ?resolver.tiers(), "Account resolver ready");

    let ledger = Arc::new(PgLedgerStore::new(db.clone()));
    let writer = Arc::new(LedgerWriter::new(ledger.clone(), resolver, accounts));

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    if config.scheduler.enabled {
        let scheduler = Arc::new(RecurringScheduler::new(
            Arc::new(PgRuleStore::new(db.clone())),
            ledger.clone(),
            Arc::clone(&writer),
            SchedulerSettings {
                max_concurrent_rules: config.scheduler.max_concurrent_rules,
            },
        ));
        let every = Duration::from_secs(config.scheduler.tick_interval_secs);
        info!(?every, "Recurring scheduler started");
        tasks.push(scheduler.spawn(every));
    }

    if config.depreciation.enabled {
        let runner = DepreciationRunner::new(ledger.clone(), Arc::clone(&writer));
        info!(interval_secs = config.depreciation.interval_secs, "Depreciation runner started");
        tasks.push(spawn_depreciation(runner, config.depreciation.clone()));
    }

    if tasks.is_empty() {
        info!("Nothing enabled, exiting");
        return Ok(());
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    for task in &tasks {
        task.abort();
    }
    Ok(())
}

fn spawn_depreciation(runner: DepreciationRunner, config: DepreciationConfig) -> JoinHandle<()> {
    let limit = usize::try_from(config.batch_limit).unwrap_or(usize::MAX);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(config.interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = runner.run_due(limit, Utc::now().date_naive()).await {
                tracing::warn!(error = %e, "Depreciation batch failed");
            }
        }
    })
}
