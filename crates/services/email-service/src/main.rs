//! Email Service - welcome email consumer.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use email_service_lib::config::EmailServiceConfig;

#[derive(Parser)]
#[command(name = "email-service")]
#[command(about = "Welcome email consumer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consume welcome notifications from the broker
    Consume {
        /// Number of competing consumers (overrides EMAIL_CONSUMER_INSTANCES)
        #[arg(long)]
        instances: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Consume { instances } => {
            let mut config = EmailServiceConfig::from_env();
            if let Some(instances) = instances {
                config.consumer_instances = instances;
            }
            email_service_lib::telemetry::init_metrics(config.metrics_address())?;
            email_service_lib::run_embedded(config).await?;
        }
    }

    Ok(())
}
