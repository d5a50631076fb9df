//! Command handlers. Each opens its own pool from the loaded configuration.

use std::sync::Arc;

use lensmatch_core::AppConfig;
use lensmatch_pipeline::{
    build_orchestrator, Orchestrator, PgStore, SnapshotStore, Store, HISTORY_WINDOW_DAYS,
};

async fn connect(config: &AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = lensmatch_db::PoolConfig::from_app_config(config);
    let pool = lensmatch_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

async fn orchestrator(config: &AppConfig) -> anyhow::Result<Orchestrator> {
    let catalogue = Arc::new(lensmatch_core::load_catalogue(&config.catalogue_path)?);
    let pool = connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    Ok(build_orchestrator(config, catalogue, store)?)
}

pub(crate) async fn run_migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = connect(config).await?;
    let applied = lensmatch_db::run_migrations(&pool).await?;
    println!("migrations applied: {applied}");
    Ok(())
}

/// Runs one full-catalogue batch in the foreground.
///
/// Per-lens failures are logged by the orchestrator and counted in the
/// summary rather than failing the command.
pub(crate) async fn run_batch(config: &AppConfig) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config).await?;
    let summary = orchestrator
        .run_batch()
        .await
        .ok_or_else(|| anyhow::anyhow!("a price batch is already running"))?;

    println!(
        "batch complete: {} lenses, {} ok, {} failed, {} snapshots, {} alerts sent",
        summary.lenses,
        summary.succeeded,
        summary.failed,
        summary.snapshots_written,
        summary.notifications_sent
    );
    Ok(())
}

pub(crate) async fn run_refresh(config: &AppConfig, lens_id: &str) -> anyhow::Result<()> {
    let orchestrator = orchestrator(config).await?;
    tracing::info!(lens_id, "manual refresh requested");
    let outcome = orchestrator.refresh_by_id(lens_id).await?;

    for (label, observation) in [
        ("amazon", outcome.stored.amazon.as_ref()),
        ("flipkart", outcome.stored.flipkart.as_ref()),
    ] {
        match observation {
            Some(o) => println!(
                "{label}: {} {}",
                o.price,
                o.url.as_deref().unwrap_or("-")
            ),
            None => println!("{label}: no price"),
        }
    }
    if outcome.alerts.notified > 0 {
        println!("alerts sent: {}", outcome.alerts.notified);
    }
    Ok(())
}

pub(crate) async fn run_prices(config: &AppConfig, lens_id: &str) -> anyhow::Result<()> {
    let store = PgStore::new(connect(config).await?);
    let latest = store.latest_per_platform(lens_id).await?;
    let history = store.history(lens_id, HISTORY_WINDOW_DAYS).await?;
    let response = lensmatch_core::build_prices_response(&latest, &history);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
