//! `HttpServer`: Axum HTTP + WebSocket server.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api;
use crate::config::ServerConfig;
use crate::dispatch::DispatchContext;
use crate::errors::ServerError;
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::{Transport, TransportConfig, TransportHost};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The process-wide dispatch context.
    pub dispatch: Arc<DispatchContext>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The HTTP server hosting the notify API and, once a dispatch context is
/// attached, the `/ws` transport.
pub struct HttpServer {
    config: ServerConfig,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    transport: RwLock<Option<Arc<Transport>>>,
    metrics: Option<PrometheusHandle>,
}

impl HttpServer {
    /// Create a new server.
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            transport: RwLock::new(None),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    ///
    /// `/ws` is only mounted if a transport has been attached.
    pub fn router(&self, dispatch: Arc<DispatchContext>) -> Router {
        let state = AppState {
            dispatch,
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        let mut router = Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/clients", get(api::list_clients))
            .route("/notify/course-update", post(api::notify_course_update))
            .route("/notify/events/{event_name}", post(api::notify_event))
            .with_state(state);

        if let Some(transport) = self.transport() {
            router = router.merge(transport.router());
        } else {
            warn!("no transport attached, /ws is not served");
        }

        router
            .layer(CorsLayer::permissive())
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Serve on an already-bound listener until shutdown.
    pub async fn serve_on(
        &self,
        listener: TcpListener,
        dispatch: Arc<DispatchContext>,
    ) -> Result<(), ServerError> {
        let app = self.router(dispatch);
        let token = self.shutdown.token();
        match listener.local_addr() {
            Ok(addr) => info!(%addr, "seatcast server listening"),
            Err(e) => warn!(error = %e, "listening on unknown address"),
        }
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { token.cancelled().await })
            .await
            .map_err(ServerError::Serve)?;
        info!("server stopped");
        Ok(())
    }

    /// Bind and serve until shutdown.
    pub async fn serve(&self, dispatch: Arc<DispatchContext>) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve_on(listener, dispatch).await
    }

    /// The attached transport, if any.
    pub fn transport(&self) -> Option<Arc<Transport>> {
        self.transport.read().clone()
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

impl TransportHost for HttpServer {
    fn transport_config(&self) -> TransportConfig {
        TransportConfig::from(&self.config)
    }

    fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.token()
    }

    fn attach_transport(&self, transport: Arc<Transport>) {
        if self.transport.write().replace(transport).is_some() {
            warn!("replacing previously attached transport");
        }
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let connections = state
        .dispatch
        .transport()
        .map_or(0, |t| t.registry().len());
    let strategy = state.dispatch.active_strategy().map(|s| s.name().to_owned());
    Json(health::health_check(state.start_time, connections, strategy))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.metrics {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed").into_response(),
    }
}
