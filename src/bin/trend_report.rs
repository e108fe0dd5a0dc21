//! Prints the trend analysis of the stored trailing window without
//! sending any notification. Pass `--json` for machine-readable output.

use chrono::{Duration, Utc};
use dominance_tracker::TrackerConfig;
use dominance_tracker::services::alerts::{accumulation_alerts, ranking_alert};
use dominance_tracker::services::sample_store::SampleStore;
use dominance_tracker::services::trend_analyzer::TrendAnalyzer;
use sea_orm::{ConnectOptions, Database};
use std::env;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let json = env::args().skip(1).any(|arg| arg == "--json");

    let config = TrackerConfig::from_env()?;

    let mut options = ConnectOptions::new(config.database_url.clone());
    options.sqlx_logging(false);
    let db = Database::connect(options).await?;
    let store = SampleStore::new(db);

    let since = Utc::now() - Duration::days(config.window_days);
    let window = store.load_window(since).await?;
    let report = TrendAnalyzer::new(config.trend).analyze(&window);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "Window: last {} days, {} dominance samples, {} assets",
        config.window_days,
        window.dominance.len(),
        window.assets.len()
    );
    println!(
        "Dominance delta: {:+.2} pp (baseline: {})",
        report.dominance_delta, config.trend.baseline
    );

    match ranking_alert(&report, config.window_days) {
        Some(alert) => println!("\n{}", alert),
        None => println!("\nNo asset has enough samples to rank yet."),
    }

    let signals = accumulation_alerts(&report);
    if !signals.is_empty() {
        println!();
        for alert in signals {
            println!("{}", alert);
        }
    }

    if !report.skipped.is_empty() {
        println!("\nSkipped:");
        for skipped in &report.skipped {
            println!("- {}: {}", skipped.asset_id, skipped.reason);
        }
    }

    Ok(())
}
