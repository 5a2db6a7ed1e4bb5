//! Switchboard Server — Application entry point.

use switchboard_server::config::ServerConfig;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("switchboard=info".parse().unwrap()),
        )
        .json()
        .init();

    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        error!(error = %e, "Failed to read .env file");
    }

    info!("Starting Switchboard server...");

    let config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = switchboard_server::run(config).await {
        error!(error = %e, "Server failed");
        std::process::exit(1);
    }

    info!("Switchboard server stopped.");
}
