//! `CoyoteServer`: axum HTTP + WebSocket relay.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse};
use crate::router::SessionRouter;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::handler::run_connection;

/// Shared state accessible from axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session registry and message routing.
    pub router: Arc<SessionRouter>,
    /// When the server started.
    pub start_time: Instant,
    /// Shutdown state, reported by `/health`.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// Outbound frames buffered per connection.
    pub send_queue_size: usize,
    /// Max inbound message size.
    pub max_message_size: usize,
}

/// The relay server.
pub struct CoyoteServer {
    config: ServerConfig,
    router: Arc<SessionRouter>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl CoyoteServer {
    /// Create a new server with an empty session registry.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_shutdown(config, Arc::new(ShutdownCoordinator::new()))
    }

    /// Create a server that stops when `shutdown` fires.
    pub fn with_shutdown(config: ServerConfig, shutdown: Arc<ShutdownCoordinator>) -> Self {
        Self {
            config,
            router: Arc::new(SessionRouter::new()),
            shutdown,
            start_time: Instant::now(),
        }
    }

    /// Build the axum router with all routes.
    pub fn app(&self) -> Router {
        let state = AppState {
            router: Arc::clone(&self.router),
            start_time: self.start_time,
            shutdown: Arc::clone(&self.shutdown),
            send_queue_size: self.config.send_queue_size,
            max_message_size: self.config.max_message_size,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/{client_id}", get(ws_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address and the serve task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let addr = listener.local_addr()?;
        let app = self.app();
        let token = self.shutdown.token();

        info!(%addr, "relay listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "relay server failed");
            }
        });
        Ok((addr, handle))
    }

    /// Session registry.
    pub fn router(&self) -> &Arc<SessionRouter> {
        &self.router
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

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.shutdown.is_shutting_down(),
        state.router.connection_count(),
        state.router.session_count(),
        state.router.bound_count(),
    ))
}

/// GET /{client_id}: WebSocket upgrade.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| {
            run_connection(socket, client_id, state.router, state.send_queue_size)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn make_server() -> CoyoteServer {
        CoyoteServer::new(ServerConfig::default())
    }

    #[tokio::test]
    async fn health_endpoint_returns_counts() {
        let server = make_server();
        let _ = server.router().new_session();
        let app = server.app();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
        assert_eq!(parsed["sessions"], 1);
        assert_eq!(parsed["bound_sessions"], 0);
    }

    #[tokio::test]
    async fn health_reports_shutdown() {
        let server = make_server();
        server.shutdown().shutdown();
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = server.app().oneshot(req).await.unwrap();
        let body = axum::body::to_bytes(resp.into_body(), 10_000)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "shutting_down");
    }

    #[tokio::test]
    async fn plain_get_on_session_path_is_not_upgraded() {
        let server = make_server();
        let req = Request::builder()
            .uri("/some-client")
            .body(Body::empty())
            .unwrap();
        let resp = server.app().oneshot(req).await.unwrap();
        assert!(resp.status().is_client_error());
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port_and_stops_on_shutdown() {
        let server = make_server();
        let (addr, handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown().shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
