//! Example service binary.
//!
//! Serves a single greeting route alongside the common health routes.

use axum::routing::get;
use axum::Router;
use clap::Parser;
use tracing::info;
use wonder_stuff_server::{
    create_logger, run_until_interrupt, start_server, LogLevel, RuntimeMode, ServerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "wonder-stuff-server")]
#[command(about = "Run an example wonder-stuff service")]
#[command(version)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Listen port, overriding configuration.
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mode = RuntimeMode::from_env();

    let loaded = ServerConfig::load(cli.config.as_deref());
    let config = loaded.as_ref().cloned().unwrap_or_default();
    let level = if cli.verbose {
        LogLevel::Debug
    } else {
        config.logging.level
    };
    let logger = create_logger(&config.server.name, mode, level);
    if let Err(e) = &loaded {
        info!(error = %e, "Failed to load config, using defaults");
    }

    let mut options = config.server_options(mode);
    if let Some(port) = cli.port {
        options = options.with_port(port);
    }

    let app = Router::new().route("/", get(|| async { "Hello from wonder-stuff\n" }));

    let Some(handle) = start_server(options, app).await else {
        logger.error("Exiting: server did not start", serde_json::Map::new());
        std::process::exit(1);
    };

    let code = run_until_interrupt(handle).await;
    info!(code, "Server stopped");
    std::process::exit(code);
}
