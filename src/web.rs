#![cfg(not(tarpaulin_include))]

use clap::Parser;
use defaidx::app;
use defaidx::config::Config;

/// Main entry point for the dashboard server
///
/// Reads configuration from flags and `DEFAIDX_*` environment variables,
/// sets up logging (`RUST_LOG` overrides the default `info` level) and
/// serves the dashboard until interrupted.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    app::run(config).await
}
