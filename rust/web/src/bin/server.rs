//! Standalone chess server binary
//!
//! Usage: cargo run -p chessduel_web --bin chessduel-server -- --port 3000

use chessduel_web::{init_logging, LogFormat, ServerConfig, WebServer, DEFAULT_OUTBOUND_BUFFER};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "chessduel-server", version, about = "Two-player chess over WebSockets")]
struct Args {
    /// Host to bind to; all interfaces by default
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,
    /// Port to bind to
    #[arg(long, short, env = "PORT", default_value_t = 3000)]
    port: u16,
    /// Directory holding index.html and other assets
    #[arg(long, short = 'd', env = "STATIC_DIR", default_value = "public")]
    static_dir: PathBuf,
    /// Events buffered per connection before it is dropped
    #[arg(long, env = "OUTBOUND_BUFFER", default_value_t = DEFAULT_OUTBOUND_BUFFER)]
    outbound_buffer: usize,
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.log_format);

    let config = ServerConfig::new(args.host, args.port, args.static_dir)
        .with_outbound_buffer(args.outbound_buffer);
    tracing::info!(
        host = config.host(),
        port = config.port(),
        static_dir = %config.static_dir().display(),
        outbound_buffer = config.outbound_buffer(),
        "starting chess server"
    );

    let handle = WebServer::new(config)?.start().await?;
    tracing::info!("server running at http://{}, press Ctrl+C to stop", handle.address());

    tokio::signal::ctrl_c().await?;

    tracing::info!("shutting down");
    handle.shutdown().await?;
    Ok(())
}
