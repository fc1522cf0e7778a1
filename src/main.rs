//! Rota Modem - Entry Point
//!
//! Wires configuration, the history backend and the rotation service into
//! the API server, then runs until Ctrl+C or SIGTERM.

use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rota_modem::account::HttpAccountClient;
use rota_modem::api::{ApiServer, AppState};
use rota_modem::config::{Config, HistoryBackendKind, LogConfig};
use rota_modem::history::{FileHistoryBackend, HistoryStore};
use rota_modem::repository::PgHistoryRepository;
use rota_modem::rotation::{ReqwestTransport, RotationEngine, TokioClock};
use rota_modem::{Database, RotationService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    init_tracing(&config.log);

    info!("Starting Rota Modem");

    let (history, db) = open_history(&config).await?;
    info!(backend = history.backend_name(), "History store ready");

    let account = Arc::new(
        HttpAccountClient::new(&config.account).context("Failed to build account client")?,
    );
    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP transport")?);
    let engine = Arc::new(RotationEngine::new(
        transport,
        account.clone(),
        Arc::new(TokioClock),
        config.rotation.clone(),
    ));
    let service = RotationService::new(
        account,
        engine,
        history,
        config.account.api_token.clone(),
    );

    let (shutdown_tx, _) = watch::channel(false);
    let api_server = ApiServer::new(AppState::new(service, config.clone(), db.clone()));
    let api_shutdown = shutdown_tx.subscribe();
    let api_task = tokio::spawn(async move {
        if let Err(e) = api_server.run(api_shutdown).await {
            error!("API server error: {}", e);
        }
    });

    info!("API listening on {}", config.api_addr());

    shutdown_signal().await;
    info!("Shutdown signal received");

    let _ = shutdown_tx.send(true);
    let _ = api_task.await;

    if let Some(db) = db {
        db.close().await;
    }

    info!("Rota Modem stopped");
    Ok(())
}

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("rota_modem={},tower_http=debug", log.level).into());
    let registry = tracing_subscriber::registry().with(filter);

    if log.format.eq_ignore_ascii_case("pretty") {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    }
}

async fn open_history(config: &Config) -> anyhow::Result<(HistoryStore, Option<Database>)> {
    match config.history.backend {
        HistoryBackendKind::File => {
            info!(path = %config.history.path.display(), "Using file history backend");
            let backend = FileHistoryBackend::new(config.history.path.clone());
            Ok((HistoryStore::new(Arc::new(backend)), None))
        }
        HistoryBackendKind::Memory => Ok((HistoryStore::in_memory(), None)),
        HistoryBackendKind::Postgres => {
            let db = Database::new(config)
                .await
                .context("Failed to connect to database")?;
            db.run_migrations()
                .await
                .context("Failed to run database migrations")?;
            let repo = PgHistoryRepository::new(db.pool().clone());
            Ok((HistoryStore::new(Arc::new(repo)), Some(db)))
        }
    }
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
