//! The web front-end: a single-page question form plus a JSON API.

pub mod error;
mod routes;

use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use medkg_core::graph::MedGraph;
use medkg_query::QaService;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared handler state. The graph is immutable once loaded; handlers
/// only ever read it.
#[derive(Clone)]
pub struct AppState {
    pub graph: Option<Arc<MedGraph>>,
    pub qa: Arc<QaService>,
}

impl AppState {
    pub fn new(graph: Option<Arc<MedGraph>>, qa: Arc<QaService>) -> Self {
        Self { graph, qa }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/api/health", get(routes::health))
        .route("/api/query", post(routes::query))
        .route("/api/entities", get(routes::entities))
        .route("/api/entity/{id}", get(routes::entity_detail))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: AppState, host: &str, port: u16) -> Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, router(state))
        .await
        .context("server error")?;
    Ok(())
}
