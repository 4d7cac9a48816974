//! User service configuration.

use std::env;

use common::{DatabaseConfig, ServiceConfig};
use messaging::BrokerConfig;

/// User service configuration.
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// HTTP bind settings
    pub server: ServiceConfig,
    /// Database connection settings
    pub database: DatabaseConfig,
    /// Exchange, queue and routing key for welcome notifications
    pub broker: BrokerConfig,
}

impl UserServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            server: ServiceConfig {
                service_name: defaults.server.service_name,
                host: env::var("USER_SERVICE_HOST").unwrap_or(defaults.server.host),
                port: env::var("USER_SERVICE_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(defaults.server.port),
            },
            database: DatabaseConfig {
                url: env::var("USER_SERVICE_DATABASE_URL")
                    .or_else(|_| env::var("DATABASE_URL"))
                    .unwrap_or(defaults.database.url),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(defaults.database.max_connections),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .unwrap_or(defaults.database.min_connections),
            },
            broker: BrokerConfig::from_env(),
        }
    }

    /// Override the bind address (CLI flags take precedence over env).
    pub fn with_address(mut self, host: impl Into<String>, port: u16) -> Self {
        self.server.host = host.into();
        self.server.port = port;
        self
    }
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            server: ServiceConfig {
                service_name: "user-service".to_string(),
                host: "0.0.0.0".to_string(),
                port: 8081,
            },
            database: DatabaseConfig::default(),
            broker: BrokerConfig::default(),
        }
    }
}
