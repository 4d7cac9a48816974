//! Prometheus scrape endpoint.

use axum::{extract::State, routing::get, Router};

use crate::api::state::AppState;

/// Create metrics routes.
pub fn metrics_routes() -> Router<AppState> {
    Router::new().route("/", get(metrics))
}

/// Render every recorded metric in Prometheus text format.
pub async fn metrics(State(state): State<AppState>) -> String {
    match &state.metrics {
        Some(handle) => handle.render(),
        None => "# Metrics not initialized\n".to_string(),
    }
}
