//! Research gateway: process entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config
//!   3. Init logger at the configured level
//!   4. Build the gateway
//!   5. Serve until Ctrl-C

use research_gateway::{
    config,
    error::AppError,
    gateway::Gateway,
    logger,
    server::{self, AppState},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present: ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let config = config::load()?;
    logger::init(&config.log_level)?;

    info!(
        scope = ?config.scope,
        iam_url = %config.watson.iam_url,
        deployment_id = %config.watson.deployment_id,
        log_level = %config.log_level,
        "config loaded"
    );
    if config.scope.is_demo() {
        warn!("running in demo mode: responses are simulated, no upstream calls are made");
    }

    let gateway = Gateway::from_config(&config)?;
    let state = AppState::new(&config.server.service_name, gateway);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("ctrl-c received, shutting down");
                signal_token.cancel();
            }
            Err(e) => warn!("cannot listen for ctrl-c: {e}"),
        }
    });

    server::serve(&config.server.bind_addr(), state, shutdown).await
}
