//! DB API Gateway - Main entry point.
//!
//! Serves the management API (endpoints, domains, REST API projects) and
//! the generated routes over HTTP.

use clap::Parser;
use db_api_gateway::catalog;
use db_api_gateway::config::Config;
use db_api_gateway::transport::{AppState, HttpTransport};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();

    init_tracing(&config);

    if let Err(message) = config.validate() {
        eprintln!("Error: {message}");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  db-api-gateway --catalog sqlite:gateway.db");
        eprintln!("  db-api-gateway --catalog memory --port 8080");
        eprintln!("  db-api-gateway --host 0.0.0.0 --api-prefix /api");
        std::process::exit(1);
    }

    info!("Starting DB API Gateway v{}", env!("CARGO_PKG_VERSION"));

    let store = catalog::open(&config.catalog).await?;

    // No request timeout: slow upstreams are awaited.
    let client = reqwest::Client::builder().build()?;

    let state = AppState::new(store, client);
    let transport = HttpTransport::new(
        state,
        &config.host,
        config.port,
        config.normalized_prefix(),
    );

    if let Err(e) = transport.run().await {
        error!(error = %e, "Server error");
        return Err(e.into());
    }

    info!("Server shutdown complete");
    Ok(())
}
