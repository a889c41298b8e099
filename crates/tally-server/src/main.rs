//! Tally Server - Main entry point

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tally_common::logging::{init_logging, LogConfig};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::info;

use tally_server::{
    api,
    audit::SensitiveFieldMasker,
    config::Config,
    db,
    features::FeatureState,
    metrics::OperationMetrics,
    retention::RetentionSweeper,
    store::Stores,
};

#[derive(Debug, Parser)]
#[command(name = "tally-server", version, about = "Tally expense tracking API server")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Keep all data in process memory instead of PostgreSQL
        #[arg(long, env = "TALLY_IN_MEMORY")]
        in_memory: bool,
    },
    /// Run one retention sweep against the database and exit
    Sweep,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Environment variables take precedence over these defaults
    let log_config = LogConfig::builder()
        .log_file_prefix("tally-server")
        .filter_directives("tally_server=debug,tower_http=debug,sqlx=info")
        .build()
        .merge_env()?;
    let _log_guard = init_logging(&log_config)?;

    let config = Config::load()?;
    info!(
        "Configuration loaded - server will bind to {}:{}",
        config.server.host, config.server.port
    );

    match cli.command.unwrap_or(Command::Serve { in_memory: false }) {
        Command::Serve { in_memory } => serve(config, in_memory).await,
        Command::Sweep => sweep(config).await,
    }
}

async fn serve(config: Config, in_memory: bool) -> Result<()> {
    info!("Starting Tally Server");

    let (stores, pool) = if in_memory {
        info!("Using in-memory stores; data is lost on shutdown");
        (Stores::in_memory(), None)
    } else {
        let pool = connect(&config).await?;
        (Stores::postgres(pool.clone()), Some(pool))
    };

    let metrics = Arc::new(OperationMetrics::new()?);
    let masker = SensitiveFieldMasker::new(config.audit.sensitive_fields.iter().cloned());
    // The binary ships no identity provider or export renderer, so login
    // and export stay unmounted; embedders add them via `with_identity`
    // and `with_exporter`.
    let state = FeatureState::new(stores.clone(), masker, metrics);

    let shutdown = CancellationToken::new();
    let sweeper = RetentionSweeper::new(
        stores.audit,
        stores.security,
        config.audit.retention_days,
        Duration::from_secs(config.audit.sweep_interval_secs),
    )
    .start(shutdown.child_token());

    let app = api::create_router(state, &config.cors, pool);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    let timeout_secs = config.server.shutdown_timeout_secs;
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(async move {
            shutdown_signal(timeout_secs).await;
            server_shutdown.cancel();
        })
        .await?;

    shutdown.cancel();
    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Retention sweeper task failed");
    }

    info!("Server shut down gracefully");
    Ok(())
}

async fn sweep(config: Config) -> Result<()> {
    let pool = connect(&config).await?;
    let stores = Stores::postgres(pool);
    let sweeper = RetentionSweeper::new(
        stores.audit,
        stores.security,
        config.audit.retention_days,
        Duration::from_secs(config.audit.sweep_interval_secs),
    );

    let report = sweeper.sweep_once(Utc::now()).await;
    info!(
        audit_records = report.audit_records,
        security_events = report.security_events,
        "One-off retention sweep complete"
    );
    Ok(())
}

async fn connect(config: &Config) -> Result<sqlx::PgPool> {
    let pool = db::create_pool(&config.database).await?;
    info!("Database connection pool established");

    db::run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    Ok(pool)
}

/// Graceful shutdown signal handler
async fn shutdown_signal(timeout_secs: u64) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }

    info!("Waiting up to {} seconds for connections to close", timeout_secs);
    tokio::time::sleep(Duration::from_secs(timeout_secs.min(5))).await;
}
