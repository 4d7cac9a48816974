//! Prometheus metrics for the user service.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Counter incremented whenever a welcome notification could not be published.
pub const WELCOME_PUBLISH_FAILURES: &str = "user_service_welcome_publish_failures_total";

/// Install the process-wide Prometheus recorder.
///
/// Call once at startup. The returned handle renders the `/metrics` page.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    metrics::describe_counter!(
        WELCOME_PUBLISH_FAILURES,
        "Welcome notifications that failed to reach the broker"
    );

    info!("Prometheus metrics recorder initialized");
    Ok(handle)
}
