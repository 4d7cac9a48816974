//! Combined binary for development - runs both services in one process.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use email_service_lib::config::EmailServiceConfig;
use messaging::{AmqpChannel, InMemoryBroker, MessageChannel};
use user_service_lib::config::UserServiceConfig;

#[derive(Parser)]
#[command(name = "user-notifications")]
#[command(about = "Combined user and email services for development")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the user service and the email consumer in a single process
    Serve {
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        #[arg(long, default_value = "8081")]
        port: u16,
        /// Route notifications through an in-process broker instead of RabbitMQ
        #[arg(long)]
        in_memory_broker: bool,
    },
    /// Run database migrations for the user service
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
}

#[derive(Subcommand, Clone, Copy)]
enum MigrateAction {
    /// Run pending migrations
    Up,
    /// Rollback last migration
    Down,
    /// Show migration status
    Status,
    /// Reset database and run all migrations
    Fresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            in_memory_broker,
        } => {
            let user_config = UserServiceConfig::from_env().with_address(host, port);
            let email_config = EmailServiceConfig::from_env();

            info!("Starting combined services in development mode");
            info!("  User service: http://{}", user_config.server.bind_address());
            info!(
                "  Broker:       {}",
                if in_memory_broker { "in-memory" } else { "RabbitMQ" }
            );

            // One recorder for both services, scraped from the user service's /metrics
            let metrics = user_service_lib::telemetry::init_metrics()?;

            // Both services share one connection; topology is declared once.
            let channel: Arc<dyn MessageChannel> = if in_memory_broker {
                Arc::new(InMemoryBroker::with_topology(&user_config.broker))
            } else {
                let amqp = AmqpChannel::connect(&user_config.broker).await?;
                amqp.declare_topology(&user_config.broker).await?;
                Arc::new(amqp)
            };

            let users = user_service_lib::run_with_channel(user_config, channel.clone(), metrics);
            let emails = email_service_lib::run_with_channel(email_config, channel);

            // Both listen for Ctrl+C; the first to return ends the process
            tokio::select! {
                result = users => {
                    if let Err(e) = result {
                        error!("User service failed: {}", e);
                    }
                }
                result = emails => {
                    if let Err(e) = result {
                        error!("Email service failed: {}", e);
                    }
                }
            }
        }
        Commands::Migrate { action } => {
            let migrate_action = match action {
                MigrateAction::Up => user_service_lib::MigrateAction::Up,
                MigrateAction::Down => user_service_lib::MigrateAction::Down,
                MigrateAction::Status => user_service_lib::MigrateAction::Status,
                MigrateAction::Fresh => user_service_lib::MigrateAction::Fresh,
            };

            user_service_lib::run_migrations(migrate_action).await?;
        }
    }

    Ok(())
}
