//! API server
//!
//! Wires the crash engine, store, and auth into an axum application and
//! runs it until a shutdown signal arrives. The crash round driver is
//! spawned here so a running server always has a live round.

use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};

use dashmap::DashMap;
use tokio::signal;
use tokio::sync::Mutex;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use crate::auth::TokenVerifier;
use crate::config::CroupierConfig;
use crate::crash::{entropy_source, spawn_driver, CrashEngine, UniformSource};
use crate::errors::{GameError, GameResult};
use crate::store::Store;

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    monitoring::{track_metrics, MetricsRegistry},
    routes::create_router,
};

/// The game server: HTTP API, WebSocket feed, and the round driver
pub struct ApiServer {
    config: CroupierConfig,
    store: Arc<dyn Store>,
}

impl ApiServer {
    pub fn new(config: CroupierConfig, store: Arc<dyn Store>) -> Self {
        Self { config, store }
    }

    /// Start the server and block until shutdown.
    pub async fn run(self) -> GameResult<()> {
        self.run_with_source(entropy_source()).await
    }

    /// Same as [`run`](Self::run) with an injected random source.
    pub async fn run_with_source(self, source: UniformSource) -> GameResult<()> {
        let (app, engine) = self.app(source);
        let driver = spawn_driver(engine);
        let addr = self.socket_addr()?;

        info!(%addr, "starting croupier server");
        self.log_endpoints();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GameError::Persistence(format!("cannot bind {}: {}", addr, e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| GameError::Persistence(format!("server error: {}", e)))?;

        driver.abort();
        info!("server stopped");
        Ok(())
    }

    /// Build the application router and the engine it serves. The run
    /// loop binds it to a socket; in-process tests drive it directly.
    pub fn app(&self, source: UniformSource) -> (axum::Router, Arc<Mutex<CrashEngine>>) {
        let engine = Arc::new(Mutex::new(CrashEngine::new(
            self.config.crash.clone(),
            self.store.clone(),
            source,
        )));
        (self.create_app(engine.clone()), engine)
    }

    fn create_app(&self, engine: Arc<Mutex<CrashEngine>>) -> axum::Router {
        let state = Arc::new(AppState {
            engine,
            store: self.store.clone(),
            verifier: TokenVerifier::new(&self.config.auth.token_secret),
            metrics: Arc::new(MetricsRegistry::new()),
            live_hands: DashMap::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
        });

        create_router(state.clone())
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))
            // Request/error counters
            .layer(axum::middleware::from_fn_with_state(state, track_metrics))
            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.server.allowed_origins.clone()))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.server.request_timeout_secs,
            )))
            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    fn socket_addr(&self) -> GameResult<SocketAddr> {
        let host = self
            .config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| {
                GameError::Validation(format!("invalid host {}: {}", self.config.server.host, e))
            })?;
        Ok(SocketAddr::from((host, self.config.server.port)))
    }

    fn log_endpoints(&self) {
        info!("available endpoints:");
        info!("  GET  /health               - health check");
        info!("  GET  /api/crash/state      - current round");
        info!("  POST /api/crash/bet        - stake the next round");
        info!("  POST /api/crash/cashout    - lock in a multiplier");
        info!("  POST /api/slots/spin       - spin the slots");
        info!("  POST /api/dice/roll        - over/under dice");
        info!("  POST /api/plinko/drop      - drop a plinko ball");
        info!("  POST /api/blackjack/start  - deal a hand");
        info!("  POST /api/blackjack/action - hit or stand");
        info!("  GET  /api/user/balance     - caller balance");
        info!("  GET  /api/user/stats       - caller stats");
        info!("  GET  /ws                   - live round feed");
        info!("  GET  /metrics              - Prometheus metrics");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(%err, "failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => tracing::error!(%err, "failed to install signal handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received terminate signal"),
    }
}
