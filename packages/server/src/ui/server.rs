//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;

use crate::usecase::CollabService;

use super::{
    handler::{get_project_presence, get_status, health_check, websocket_handler},
    signal::shutdown_signal,
    state::{AppState, TransportSettings},
};

/// Collaboration server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(service, TransportSettings::default());
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance
    ///
    /// # Arguments
    ///
    /// * `service` - All use cases, wired to their repositories and collaborators
    /// * `transport` - Outbound queue size, ping interval and idle timeout
    pub fn new(service: CollabService, transport: TransportSettings) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            state: Arc::new(AppState {
                service: Arc::new(service),
                transport,
                shutdown,
            }),
        }
    }

    /// Build the router with all endpoints
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/status", get(get_status))
            .route("/api/projects/{project_id}/presence", get(get_project_presence))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl+C or SIGTERM
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Quill server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?token=<access token>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.run_with_listener(listener, shutdown_signal()).await?;
        Ok(())
    }

    /// Serve on an already bound listener until `signal` resolves
    ///
    /// On shutdown every open WebSocket session is told to stop, and any session
    /// still registered afterwards is reaped so that members see `user-left`.
    pub async fn run_with_listener<F>(self, listener: TcpListener, signal: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let state = self.state.clone();
        let shutdown = async move {
            signal.await;
            state.shutdown.send_replace(true);
        };

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        self.state.service.shutdown().await;
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
