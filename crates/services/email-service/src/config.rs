//! Email service configuration.

use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use messaging::BrokerConfig;

/// Email service configuration.
#[derive(Debug, Clone)]
pub struct EmailServiceConfig {
    /// Sender address shown on delivered emails
    pub from: String,
    /// Number of competing consumers on the welcome queue
    pub consumer_instances: usize,
    /// Queue and consumer tag to subscribe with
    pub broker: BrokerConfig,
    /// Port of the Prometheus scrape endpoint
    pub metrics_port: u16,
}

impl EmailServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            from: env::var("EMAIL_FROM").unwrap_or(defaults.from),
            consumer_instances: env::var("EMAIL_CONSUMER_INSTANCES")
                .ok()
                .and_then(|n| n.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(defaults.consumer_instances),
            broker: BrokerConfig::from_env(),
            metrics_port: env::var("EMAIL_METRICS_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.metrics_port),
        }
    }

    /// Address the Prometheus exporter binds to.
    pub fn metrics_address(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.metrics_port)
    }
}

impl Default for EmailServiceConfig {
    fn default() -> Self {
        Self {
            from: "noreply@example.com".to_string(),
            consumer_instances: 1,
            broker: BrokerConfig::default(),
            metrics_port: 9091,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_run_a_single_consumer() {
        let config = EmailServiceConfig::default();
        assert_eq!(config.consumer_instances, 1);
        assert_eq!(config.broker.queue, "email.welcome");
        assert_eq!(config.metrics_address().to_string(), "0.0.0.0:9091");
    }
}
