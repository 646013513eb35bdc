//! `FleetServer` — Axum HTTP + WebSocket gateway.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use fleet_registry::{ConnectionRegistry, NotificationBroadcaster};
use fleet_settings::GatewaySettings;

use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;
use crate::sweep::run_sweeper;
use crate::websocket::{dispatch_ws_handler, rider_ws_handler};

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live channel registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Notification fan-out over the registry.
    pub broadcaster: Arc<NotificationBroadcaster>,
    /// Gateway tuning.
    pub settings: Arc<GatewaySettings>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
}

/// The dispatch gateway server.
pub struct FleetServer {
    settings: Arc<GatewaySettings>,
    registry: Arc<ConnectionRegistry>,
    broadcaster: Arc<NotificationBroadcaster>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl FleetServer {
    /// Create a new server with its own registry and broadcaster.
    #[must_use]
    pub fn new(settings: GatewaySettings) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let broadcaster = Arc::new(NotificationBroadcaster::new(registry.clone()));
        Self {
            settings: Arc::new(settings),
            registry,
            broadcaster,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    #[must_use]
    pub fn router(&self) -> Router {
        let state = AppState {
            registry: self.registry.clone(),
            broadcaster: self.broadcaster.clone(),
            settings: self.settings.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/ws/riders", get(rider_ws_handler))
            .route("/ws/dispatch", get(dispatch_ws_handler))
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the join handle
    /// of the serve task. Also starts the periodic stale sweep.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
        let addr = format!("{}:{}", self.settings.host, self.settings.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "gateway listening");

        let _ = tokio::spawn(run_sweeper(
            self.registry.clone(),
            Duration::from_millis(self.settings.sweep_interval_ms),
            self.shutdown.token(),
        ));

        let router = self.router();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await });
            if let Err(e) = serve.await {
                tracing::error!(error = %e, "server task failed");
            }
        });

        Ok((local_addr, handle))
    }

    /// Get the live channel registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the notification broadcaster.
    #[must_use]
    pub fn broadcaster(&self) -> &Arc<NotificationBroadcaster> {
        &self.broadcaster
    }

    /// Get the shutdown coordinator.
    #[must_use]
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the gateway settings.
    #[must_use]
    pub fn settings(&self) -> &GatewaySettings {
        &self.settings
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let resp = health::health_check(state.start_time, state.registry.stats());
    Json(resp)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use fleet_core::CourierId;
    use fleet_registry::MpscChannel;
    use tower::ServiceExt;

    fn make_server() -> FleetServer {
        let settings = GatewaySettings {
            port: 0,
            ..GatewaySettings::default()
        };
        FleetServer::new(settings)
    }

    #[tokio::test]
    async fn health_route_reports_ok() {
        let server = make_server();
        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 10_000).await.unwrap();
        let val: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(val["status"], "ok");
        assert_eq!(val["connections"]["totalConnections"], 0);
    }

    #[tokio::test]
    async fn health_reflects_registered_connections() {
        let server = make_server();
        let (tx, _rx) = tokio::sync::mpsc::channel(8);
        server
            .registry()
            .register_courier(CourierId::new(1), Arc::new(MpscChannel::new(tx)));

        let response = server
            .router()
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), 10_000).await.unwrap();
        let val: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(val["connections"]["connectedRiders"], 1);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let server = make_server();
        let response = server
            .router()
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn listen_binds_ephemeral_port() {
        let server = make_server();
        let (addr, _handle) = server.listen().await.unwrap();
        assert_ne!(addr.port(), 0);
        server.shutdown().shutdown();
    }
}
