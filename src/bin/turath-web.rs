// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Turath API server
//!
//! Standalone HTTP server for the sign-up and capture screens.

use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use turath::config::AppConfig;
use turath::db::Database;
use turath::Result;

#[derive(Parser, Debug)]
#[command(name = "turath-web")]
#[command(author = "Jonathan D. A. Jewell <hyperpolymath>")]
#[command(version = "1.0.0")]
#[command(about = "Turath API Server")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    /// Host to bind to
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Model server URL
    #[arg(long)]
    model_url: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!("Turath API Server v1.0.0");

    let mut config = AppConfig::load(&args.config)?;

    // Apply CLI overrides
    if let Some(host) = args.host {
        config.web.host = host;
    }
    if let Some(port) = args.port {
        config.web.port = port;
    }
    if let Some(url) = args.model_url {
        config.model.url = url;
    }

    let db = Database::open(&config.database.path)?;
    info!("Database: {}", config.database.path);
    info!("Model server: {} (model '{}')", config.model.url, config.model.name);

    turath::web::start_server(config, db).await
}
