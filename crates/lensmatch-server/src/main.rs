mod api;
mod middleware;
mod refresh_limit;
mod scheduler;

use std::{net::SocketAddr, sync::Arc, time::Duration};

use lensmatch_pipeline::{build_orchestrator, PgStore, Store};
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::ClientIdentity,
    refresh_limit::RefreshLimiter,
    scheduler::PriceScheduler,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = lensmatch_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalogue = Arc::new(lensmatch_core::load_catalogue(&config.catalogue_path)?);
    tracing::info!(lenses = catalogue.len(), "catalogue loaded");

    let pool_config = lensmatch_db::PoolConfig::from_app_config(&config);
    let pool = lensmatch_db::connect_pool(&config.database_url, pool_config).await?;
    lensmatch_db::run_migrations(&pool).await?;

    let store: Arc<dyn Store> = Arc::new(PgStore::new(pool));
    let orchestrator = Arc::new(build_orchestrator(
        &config,
        catalogue,
        Arc::clone(&store),
    )?);

    let scheduler = if config.scheduler_enabled {
        Some(PriceScheduler::start(Arc::clone(&orchestrator), &config.price_refresh_crons).await?)
    } else {
        tracing::info!("scheduler disabled; price batches run only on demand");
        None
    };

    let state = AppState {
        store,
        orchestrator,
        refresh_limiter: RefreshLimiter::new(Duration::from_secs(config.refresh_cooldown_secs)),
        client_identity: ClientIdentity::new(config.trust_proxy),
    };
    if config.trust_proxy {
        tracing::info!("client identity taken from x-forwarded-for");
    }
    let app = build_app(state, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "server listening");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
