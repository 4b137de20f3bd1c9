//! Server configuration from command-line flags and environment variables.

use clap::Parser;
use slidecheck_core::compare::DEFAULT_THRESHOLD;
use slidecheck_translate::google::DEFAULT_ENDPOINT;
use std::net::IpAddr;
use std::path::PathBuf;

/// Web UI for comparing a deck with its translation.
#[derive(Parser, Debug, Clone)]
#[command(name = "slidecheck-server")]
#[command(author, version, about, long_about = None)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Deployment environment; "production" disables debug output.
    /// Read from FLASK_ENV so existing deployment manifests keep working.
    #[arg(long = "env", env = "FLASK_ENV", default_value = "development")]
    pub environment: String,

    /// Directory uploaded decks are stored in
    #[arg(long, env = "UPLOAD_DIR", default_value = "uploads")]
    pub upload_dir: PathBuf,

    /// Directory reports are written to, one subdirectory per job
    #[arg(long, env = "REPORT_DIR", default_value = "reports")]
    pub report_dir: PathBuf,

    /// Minimum similarity (0-1) for a row to be OK
    #[arg(long, env = "SIMILARITY_THRESHOLD", default_value_t = DEFAULT_THRESHOLD)]
    pub threshold: f64,

    /// Language translated text is back-translated into
    #[arg(long, env = "BACKTRANS_TARGET", default_value = "en")]
    pub backtrans_target: String,

    /// Translation endpoint
    #[arg(long, env = "TRANSLATE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub translate_endpoint: String,

    /// Largest accepted request body, in megabytes
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = 100)]
    pub max_upload_mb: usize,
}

impl ServerConfig {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Default `env_logger` filter for this environment.
    pub fn log_filter(&self) -> &'static str {
        if self.is_production() {
            "info"
        } else {
            "info,slidecheck=debug"
        }
    }
}
