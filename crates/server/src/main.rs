mod config;
mod error;
mod jobs;
mod routes;
mod state;
mod uploads;

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;

use config::ServerConfig;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter()))
        .init();

    // Ensure directories exist
    std::fs::create_dir_all(&config.upload_dir)
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;
    std::fs::create_dir_all(&config.report_dir)
        .with_context(|| format!("Failed to create {}", config.report_dir.display()))?;

    let addr = SocketAddr::new(config.host, config.port);
    log::info!(
        "Starting slidecheck-server on http://{} ({} mode)",
        addr,
        config.environment
    );
    log::info!(
        "Uploads in {}, reports in {}",
        config.upload_dir.display(),
        config.report_dir.display()
    );

    let app = routes::create_routes(AppState::new(config));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
