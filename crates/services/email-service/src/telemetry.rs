//! Prometheus metrics for the email service.

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use tracing::info;

/// Counter of consumed messages, labelled by `outcome`.
pub const CONSUMER_MESSAGES: &str = "email_consumer_messages_total";

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
///
/// The exporter runs its own HTTP listener since this service has no router.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    metrics::describe_counter!(
        CONSUMER_MESSAGES,
        "Welcome notifications consumed, by outcome (delivered, malformed, failed)"
    );

    info!(%addr, "Prometheus exporter listening");
    Ok(())
}
