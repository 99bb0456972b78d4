//! Site Router
//!
//! Reverse proxy that sends each hostname to its site's landing page and
//! passes asset, page and API traffic through to the application backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────┐
//!                         │                 SITE ROUTER                  │
//!                         │                                              │
//!   Client Request        │  ┌─────────┐   ┌─────────┐   ┌────────────┐  │
//!   ──────────────────────┼─▶│   net   │──▶│  http   │──▶│  routing   │  │
//!                         │  │ http/tls│   │ server  │   │ classifier │  │
//!                         │  └─────────┘   └─────────┘   └─────┬──────┘  │
//!                         │                                    │         │
//!                         │        passthrough ◀───────────────┤         │
//!                         │             │                      ▼         │
//!                         │             │     ┌───────┐  ┌───────────┐   │
//!                         │             │     │ cache │◀─│  engine   │   │      Redis
//!                         │             │     │       │──┼───────────┼───┼────▶
//!                         │             │     └───────┘  └─────┬─────┘   │
//!                         │             │                      │ miss    │
//!                         │             │     ┌───────┐  ┌─────▼─────┐   │      CMS
//!                         │             │     │ auth  │─▶│    cms    │───┼────▶
//!                         │             │     └───────┘  └───────────┘   │
//!                         │             ▼                                │
//!   302 / proxied resp.   │  ┌──────────────┐                            │      Backend
//!   ◀─────────────────────┼──│   forward    │────────────────────────────┼────▶
//!                         │  └──────────────┘                            │
//!                         └──────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;

use site_router::config::load_config;
use site_router::lifecycle::startup;
use site_router::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "site-router")]
#[command(about = "Hostname-based landing page router", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Environment file to load before reading the environment.
    #[arg(long)]
    env_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // A missing default .env is normal; a missing explicit one is not.
    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let config = load_config(cli.config.as_deref())?;
    init_logging(&config.observability.log_level);

    tracing::info!("site-router v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;
    Ok(())
}
