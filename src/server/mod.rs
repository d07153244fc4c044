//! # Layout Preview Server
//!
//! HTTP front for parsing, decorating and editing-mode rendering of layout
//! documents, for wiring a JS renderer to this crate during development.
//!
//! ## Usage
//!
//! ```bash
//! sitecore-layout serve --listen 127.0.0.1:8080 --endpoint https://cm.example.com/sitecore/api/graph/edge
//! ```
//!
//! | Route | Body / query | Answer |
//! |-------|--------------|--------|
//! | `POST /api/layout/parse` | layout JSON | parsed tree |
//! | `POST /api/layout/decorate` | layout JSON | tree with chromes |
//! | `GET /api/layout/editing` | `path`, `sc_lang`, ... | editing response |

mod handlers;
mod state;

pub use state::AppState;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::editing::{EditingClient, GraphQlEditingClient};
use crate::error::LayoutError;

/// Build the router around shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/layout/parse", post(handlers::layout::parse))
        .route("/api/layout/decorate", post(handlers::layout::decorate))
        .route("/api/layout/editing", get(handlers::editing::editing))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server with a GraphQL editing client.
///
/// ## Example
///
/// ```no_run
/// use sitecore_layout::config::ServerConfig;
/// use sitecore_layout::server::serve;
///
/// # async fn example() -> Result<(), sitecore_layout::LayoutError> {
/// serve(ServerConfig::default()).await?;
/// # Ok(())
/// # }
/// ```
pub async fn serve(config: ServerConfig) -> Result<(), LayoutError> {
    let client = GraphQlEditingClient::new(&config.editing)?;
    serve_with(config, Box::new(client)).await
}

/// Start the HTTP server with any editing client.
pub async fn serve_with(config: ServerConfig, client: Box<dyn EditingClient>) -> Result<(), LayoutError> {
    let ServerConfig { listen_addr, editing } = config;
    let endpoint = editing.endpoint.clone();
    let app = router(Arc::new(AppState::new(editing, client)));

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .map_err(|e| LayoutError::transport_with(format!("failed to bind to {}", listen_addr), e))?;

    info!(listen = %listen_addr, editing_endpoint = %endpoint, "layout preview server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| LayoutError::transport_with("server error", e))?;

    info!("layout preview server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };
    #[cfg(unix)]
    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    #[cfg(not(unix))]
    ctrl_c.await;
}
