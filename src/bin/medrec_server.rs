//!
//! medrec server binary
//! --------------------
//! Command-line entry point for the medical records HTTP server. Supports
//! configuration via CLI flags and environment variables.

use anyhow::Result;
use std::env;

use medrec::config::{has_flag, ServerConfig, USAGE};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        println!("{USAGE}");
        return Ok(());
    }

    // Initialize tracing subscriber with env filter, defaulting to info
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let cfg = ServerConfig::from_env_and_args(&args);
    let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    tracing::info!(
        target: "startup",
        "medrec starting: RUST_LOG='{}', bind={}, db_folder='{}', seed={}",
        rust_log, cfg.bind_addr(), cfg.db_folder, cfg.seed
    );

    medrec::server::run_with_config(&cfg).await
}
