//! Application state for dependency injection.

use std::sync::Arc;

use messaging::MessageChannel;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::infra::Database;
use crate::service::UserService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// User management core
    pub user_service: Arc<dyn UserService>,
    /// Broker connection (health reporting only)
    pub broker: Arc<dyn MessageChannel>,
    /// Database connection, absent when running against a test store
    pub database: Option<Arc<Database>>,
    /// Prometheus handle rendering `/metrics`, absent when no recorder is installed
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state.
    pub fn new(user_service: Arc<dyn UserService>, broker: Arc<dyn MessageChannel>) -> Self {
        Self {
            user_service,
            broker,
            database: None,
            metrics: None,
        }
    }

    /// Attach the database so health checks can ping it.
    pub fn with_database(mut self, database: Arc<Database>) -> Self {
        self.database = Some(database);
        self
    }

    /// Attach the Prometheus handle served at `/metrics`.
    pub fn with_metrics(mut self, metrics: PrometheusHandle) -> Self {
        self.metrics = Some(metrics);
        self
    }
}
