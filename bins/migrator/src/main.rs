//! Database migration runner for Tally.
//!
//! Usage:
//!   migrator up [n]    - apply pending migrations (at most `n`)
//!   migrator down [n]  - roll back the last `n` migrations (default 1)
//!   migrator status    - list applied and pending migrations
//!   migrator fresh     - drop every table, then apply all migrations
//!   migrator refresh   - roll back all migrations, then apply them again
//!
//! The connection comes from the same layered configuration as the worker
//! (`TALLY__DATABASE__URL`, `config/*.toml`, `.env`).

use anyhow::{Context, bail};
use sea_orm_migration::MigratorTrait;
use tally_db::migration::Migrator;
use tally_shared::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Up(Option<u32>),
    Down(u32),
    Status,
    Fresh,
    Refresh,
}

impl Command {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let steps = args
            .get(1)
            .map(|s| s.parse::<u32>().context("step count must be a positive integer"))
            .transpose()?;
        let command = match args.first().map_or("up", String::as_str) {
            "up" => Self::Up(steps),
            "down" => Self::Down(steps.unwrap_or(1)),
            "status" => Self::Status,
            "fresh" => Self::Fresh,
            "refresh" => Self::Refresh,
            other => bail!("unknown command '{other}' (expected up, down, status, fresh or refresh)"),
        };
        Ok(command)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,sea_orm_migration=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = Command::parse(&args)?;

    let config = AppConfig::load().context("failed to load configuration")?;
    let db = tally_db::connect_with(&config.database).await?;
    tracing::info!(?command, "Connected to database");

    match command {
        Command::Up(steps) => Migrator::up(&db, steps).await?,
        Command::Down(steps) => Migrator::down(&db, Some(steps)).await?,
        Command::Status => Migrator::status(&db).await?,
        Command::Fresh => Migrator::fresh(&db).await?,
        Command::Refresh => Migrator::refresh(&db).await?,
    }

    tracing::info!(?command, "Migration command finished");
    Ok(())
}
