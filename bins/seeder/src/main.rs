//! Seeds a tenant with the standard chart of accounts.
//!
//! Usage:
//!   seeder                          - seed the development tenant
//!   seeder <tenant-id> [regime] [tz] - seed a given tenant
//!
//! `regime` is `sales_tax` (default) or `vat`; `tz` is an IANA zone name.
//! Seeding is idempotent: existing account codes are left alone.

use anyhow::Context;
use chrono_tz::Tz;
use tally_core::chart::{TaxRegime, TenantProfile};
use tally_db::{AccountRepository, TenantProfileRepository};
use tally_shared::AppConfig;
use tally_shared::types::TenantId;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Development tenant (consistent for all seeds)
const DEV_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let tenant_id: TenantId = args
        .next()
        .as_deref()
        .unwrap_or(DEV_TENANT_ID)
        .parse()
        .context("tenant id must be a UUID")?;
    let tax_regime = args
        .next()
        .map_or(TaxRegime::SalesTax, |s| TaxRegime::parse_or_default(&s));
    let time_zone = args
        .next()
        .map(|name| name.parse::<Tz>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("invalid time zone: {e}"))?;

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = tally_db::connect_with(&config.database).await?;
    tracing::info!("Connected to database");

    let inserted = AccountRepository::new(db.clone())
        .seed_standard_chart(tenant_id)
        .await?;
    TenantProfileRepository::new(db)
        .upsert(&TenantProfile {
            tenant_id,
            tax_regime,
            time_zone,
        })
        .await?;

    tracing::info!(
        %tenant_id,
        inserted,
        tax_regime = tax_regime.as_str(),
        time_zone = ?time_zone,
        "Seeding complete"
    );
    Ok(())
}
