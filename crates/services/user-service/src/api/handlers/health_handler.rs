//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;

use crate::api::state::AppState;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: ServiceStatus,
}

/// Individual service status.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<ServiceHealth>,
    pub broker: ServiceHealth,
}

/// Service health with optional error message.
#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceHealth {
    fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            error: None,
        }
    }

    fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            status: "unhealthy".to_string(),
            error: Some(error.into()),
        }
    }

    fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

/// Create health routes.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health_check))
}

/// Health check endpoint.
///
/// The database decides the status code. A disconnected broker only marks
/// the service degraded: user creation keeps working without it.
pub async fn health_check(State(state): State<AppState>) -> Response {
    let database = match &state.database {
        Some(db) => Some(match db.ping().await {
            Ok(_) => ServiceHealth::healthy(),
            Err(e) => ServiceHealth::unhealthy(e.to_string()),
        }),
        None => None,
    };

    let broker = if state.broker.is_connected() {
        ServiceHealth::healthy()
    } else {
        ServiceHealth::unhealthy("broker connection is closed")
    };

    let database_ok = database.as_ref().map_or(true, ServiceHealth::is_healthy);
    let status = match (database_ok, broker.is_healthy()) {
        (true, true) => "healthy",
        (true, false) => "degraded",
        (false, _) => "unhealthy",
    };

    let response = HealthResponse {
        status: status.to_string(),
        services: ServiceStatus { database, broker },
    };

    if database_ok {
        (StatusCode::OK, Json(response)).into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response)).into_response()
    }
}
