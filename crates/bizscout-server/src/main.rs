mod api;
mod ingest;
mod middleware;
mod scheduler;

use std::sync::Arc;

use bizscout_core::AppConfig;
use bizscout_scraper::Coordinator;
use tokio_cron_scheduler::JobScheduler;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState, IngestMode},
    ingest::Ingestor,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Arc::new(bizscout_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting bizscout-server");

    let coordinator = Arc::new(Coordinator::new(config.scraper.clone())?);
    let (ingest, mut scheduler) = start_ingest(&config, &coordinator).await?;

    let app = build_app(AppState {
        coordinator: Arc::clone(&coordinator),
        ingest,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler.as_mut() {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "scheduler shutdown failed");
        }
    }
    drop(scheduler);

    // The router and its state are gone; scheduler jobs hold only weak
    // handles, so a strong reference here means a pass is still running.
    match Arc::try_unwrap(coordinator) {
        Ok(coordinator) => coordinator.close(),
        Err(_) => tracing::warn!("ingest pass still running at shutdown; fetcher left to drop"),
    }
    tracing::info!("shutdown complete");
    Ok(())
}

/// Connects persistence and starts the scheduler when configured.
async fn start_ingest(
    config: &AppConfig,
    coordinator: &Arc<Coordinator>,
) -> anyhow::Result<(IngestMode, Option<JobScheduler>)> {
    if config.database_url.is_none() {
        tracing::warn!("database URL not configured; persistence disabled");
        return Ok((IngestMode::NoDatabase, None));
    }

    let pool = bizscout_db::connect_pool_from_config(config).await?;
    let applied = bizscout_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database ready");

    if !config.scheduler_enabled() {
        tracing::info!(env = %config.env, "scheduler disabled by configuration");
        return Ok((IngestMode::Disabled, None));
    }

    let ingestor = Arc::new(Ingestor::new(pool, Arc::clone(coordinator)));
    let scheduler =
        scheduler::build_scheduler(&ingestor, config.cron_interval_hours).await?;
    Ok((IngestMode::Enabled(ingestor), Some(scheduler)))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
