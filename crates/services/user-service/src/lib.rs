//! User Service Library
//!
//! HTTP CRUD over users, persisted with SeaORM. Every successful creation
//! publishes a welcome notification to the broker for the email service.
//! It can be run as a standalone service or embedded in the combined binary.

pub mod api;
pub mod config;
pub mod infra;
pub mod notifier;
pub mod repository;
pub mod service;
pub mod telemetry;

use std::sync::Arc;

use messaging::{AmqpChannel, MessageChannel};
use metrics_exporter_prometheus::PrometheusHandle;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::UserServiceConfig;
use crate::infra::Database;
use crate::notifier::BrokerNotifier;
use crate::repository::UserStore;
use crate::service::UserManager;

/// Run the user service against a RabbitMQ broker.
///
/// Declares the exchange, queue and binding before serving. Fails fast when
/// the broker or the database is unreachable at startup.
pub async fn run_embedded(
    config: UserServiceConfig,
    metrics: PrometheusHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    let channel = AmqpChannel::connect(&config.broker).await?;
    channel.declare_topology(&config.broker).await?;

    run_with_channel(config, Arc::new(channel), metrics).await
}

/// Run the HTTP server publishing through an already connected channel.
///
/// `metrics` is the handle of the installed Prometheus recorder, served at
/// `/metrics`.
pub async fn run_with_channel(
    config: UserServiceConfig,
    channel: Arc<dyn MessageChannel>,
    metrics: PrometheusHandle,
) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize database
    let db = Arc::new(Database::connect(&config.database).await?);

    // Create repository, publisher and service
    let user_repo = Arc::new(UserStore::new(db.get_connection()));
    let notifier = Arc::new(BrokerNotifier::from_config(channel.clone(), &config.broker));
    let user_service = Arc::new(UserManager::new(user_repo, notifier));

    let state = AppState::new(user_service, channel)
        .with_database(db)
        .with_metrics(metrics);
    let app = create_router(state);

    let addr = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(
        service = %config.server.service_name,
        exchange = %config.broker.exchange,
        routing_key = %config.broker.routing_key,
        "Listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("User service stopped");
    Ok(())
}

/// Run migrations (for CLI commands).
pub async fn run_migrations(action: MigrateAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = UserServiceConfig::from_env();
    let db = Database::connect_without_migrations(&config.database).await?;

    match action {
        MigrateAction::Up => {
            db.run_migrations().await?;
            info!("Migrations applied successfully");
        }
        MigrateAction::Down => {
            db.rollback_migration().await?;
            info!("Rolled back last migration");
        }
        MigrateAction::Status => {
            let status = db.migration_status().await?;
            for (name, applied) in status {
                let marker = if applied { "[x]" } else { "[ ]" };
                println!("{} {}", marker, name);
            }
        }
        MigrateAction::Fresh => {
            db.fresh_migrations().await?;
            info!("Database reset and migrations applied");
        }
    }

    Ok(())
}

/// Migration action type.
#[derive(Debug, Clone, Copy)]
pub enum MigrateAction {
    Up,
    Down,
    Status,
    Fresh,
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal, stopping user service...");
    }
}
