//! API server using Axum

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::Router;
use tokio::sync::watch;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use crate::config::{ApiServerConfig, Config};
use crate::database::Database;
use crate::error::{Result, RotaError};
use crate::services::RotationService;

use super::handlers::rotations::MAX_WAIT_CEILING;
use super::middleware::{cors_layer, RequestLogging};
use super::routes;

/// Upper bound for one HTTP request; a batch at full budget fits well inside
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(MAX_WAIT_CEILING.as_secs() * 3);

/// Shared state for API handlers
#[derive(Clone)]
pub struct AppState {
    pub service: RotationService,
    pub config: Config,
    pub started_at: Instant,
    /// Present only with the postgres history backend
    pub db: Option<Database>,
}

impl AppState {
    pub fn new(service: RotationService, config: Config, db: Option<Database>) -> Self {
        Self {
            service,
            config,
            started_at: Instant::now(),
            db,
        }
    }
}

/// API server
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(state: AppState) -> Self {
        Self {
            config: state.config.api.clone(),
            state,
        }
    }

    /// Router with timeout, CORS, request logging and HTTP tracing applied
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone())
            .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
            .layer(axum::middleware::from_fn(RequestLogging::log_request))
            .layer(cors_layer(&self.config.cors_origins))
            .layer(TraceLayer::new_for_http())
    }

    /// Serve until `shutdown` flips
    #[instrument(skip(self, shutdown))]
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|e| RotaError::InvalidConfig(format!("Invalid API server address: {}", e)))?;

        let router = self.build_router();
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("API server listening on {}", addr);

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.changed().await;
            })
            .await
            .map_err(|e| RotaError::Internal(e.to_string()))?;

        info!("API server shut down");
        Ok(())
    }
}
