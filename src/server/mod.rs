//! HTTP surface
//!
//! # Module Organization
//!
//! - [`handlers`] - Route handlers for the fetch endpoints
//! - [`error`] - Status code and body mapping for service errors
//!
//! # Routes
//!
//! | Method | Path             | Handler                         |
//! |--------|------------------|---------------------------------|
//! | POST   | `/video_info`    | [`handlers::video_info`]        |
//! | POST   | `/download`      | [`handlers::start_download`]    |
//! | GET    | `/progress`      | [`handlers::progress`]          |
//! | GET    | `/download_file` | [`handlers::download_file`]     |
//! | GET    | `/health`        | [`handlers::health`]            |

pub mod error;
pub mod handlers;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::app::FetchService;

pub use error::{ApiError, ErrorBody};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    pub service: Arc<FetchService>,
}

impl AppState {
    pub fn new(service: Arc<FetchService>) -> Self {
        Self { service }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/video_info", post(handlers::video_info))
        .route("/download", post(handlers::start_download))
        .route("/progress", get(handlers::progress))
        .route("/download_file", get(handlers::download_file))
        .route("/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind a listener on `host:port`
pub async fn bind(host: &str, port: u16) -> std::io::Result<TcpListener> {
    let listener = TcpListener::bind((host, port)).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    Ok(listener)
}

/// Serve until `shutdown` resolves, then drain open connections
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state).into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await
}

/// Resolves on Ctrl+C
pub async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        // never resolve rather than shutting down immediately
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
