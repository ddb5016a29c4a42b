//! xref-viz - Bible cross-reference visualization server
//!
//! Serves the cross-reference dataset in a data directory as a JSON API.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use xref_viz::{Result, XrefConfig, XrefServer};

/// Bible cross-reference visualization server
#[derive(Parser, Debug)]
#[command(name = "xref-viz")]
#[command(version)]
#[command(about = "Filtered cross-reference graph, arc and chord views over HTTP", long_about = None)]
struct Args {
    /// Host to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8888)]
    port: u16,

    /// Directory containing graph_data.json
    #[arg(short, long, default_value = "data")]
    data_dir: PathBuf,

    /// Disable CORS headers for cross-origin requests
    #[arg(long = "no-cors", action = clap::ArgAction::SetFalse)]
    cors: bool,

    /// Timeout for reading one dataset file, in seconds
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,

    /// Connections served by /api/preview
    #[arg(long, default_value_t = 200)]
    preview_size: usize,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = XrefConfig {
        host: args.host,
        port: args.port,
        enable_cors: args.cors,
        enable_tracing: args.verbose > 0,
        data_dir: args.data_dir,
        fetch_timeout: Duration::from_secs(args.timeout_secs),
        preview_size: args.preview_size,
        ..XrefConfig::default()
    };

    let server = XrefServer::new(config);
    server.load().await?;

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
        log::info!("Shutdown signal received");
    };

    server.start_with_shutdown(shutdown).await
}
