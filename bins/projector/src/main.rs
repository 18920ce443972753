//! Campusplan projector
//!
//! Runs the cash engine over a tabs file and prints the outcome as JSON.
//!
//! The input file holds `{version_id?, pnl, balance_sheet, cash_flow,
//! admin_settings?}`. Storage is in memory, so each invocation starts cold
//! unless `--runs` asks for repeated calls against the same store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campusplan_core::projection::{CashEngineService, InMemoryStore, VersionStatus, VersionTabs};
use campusplan_shared::AppConfig;
use campusplan_shared::types::VersionId;

/// Run a multi-year campus projection from a tabs file
#[derive(Parser)]
#[command(name = "projector", version, about)]
struct Cli {
    /// JSON file with the P&L, balance sheet and cash flow tabs
    tabs: PathBuf,

    /// Recompute even if a result is cached
    #[arg(long)]
    force: bool,

    /// Number of consecutive runs against the same store
    #[arg(long, default_value_t = 1)]
    runs: u32,
}

#[derive(Deserialize)]
struct ProjectorInput {
    #[serde(default)]
    version_id: Option<VersionId>,
    #[serde(flatten)]
    tabs: VersionTabs,
    #[serde(default)]
    admin_settings: HashMap<String, Value>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing (stderr, so stdout stays pure JSON)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campusplan=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    let raw = std::fs::read_to_string(&cli.tabs)
        .with_context(|| format!("Failed to read {}", cli.tabs.display()))?;
    let input: ProjectorInput = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", cli.tabs.display()))?;

    let version_id = input.version_id.unwrap_or_default();
    let store = Arc::new(InMemoryStore::new());
    store.insert_version(version_id, VersionStatus::Draft, input.tabs);
    for (key, value) in input.admin_settings {
        store.set_admin_setting(key, value);
    }

    let service = CashEngineService::new(store.clone(), store.clone(), store.clone(), &config);
    info!(
        version_id = %version_id,
        start_year = config.engine.start_year,
        end_year = config.engine.end_year,
        "Projector ready"
    );

    let mut outcome = service.recalculate(version_id, cli.force).await;
    for _ in 1..cli.runs {
        outcome = service.recalculate(version_id, cli.force).await;
    }

    let report = json!({
        "outcome": &outcome,
        "years": outcome.result.as_deref(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !outcome.success {
        anyhow::bail!("projection failed: {}", outcome.errors.join("; "));
    }
    Ok(())
}
