//! Echo server demo for the tcp-host lifecycle manager.
//!
//! Wires the pass-through pipeline and an echo handler into a
//! [`TcpServer`], runs it until Ctrl-C, then stops it gracefully.

use std::io;
use std::path::PathBuf;

use clap::Parser;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use tcp_host::config::{load_config, ServerConfig};
use tcp_host::observability::{self, MetricsRecorderFactory};
use tcp_host::{ConnectionHandler, FramedConnection, RawPipeline, TcpServer};

#[derive(Parser)]
#[command(name = "tcp-host")]
#[command(about = "Echo server built on the tcp-host lifecycle manager", long_about = None)]
struct Cli {
    /// Path to a TOML config file; built-in defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to bind; 0 asks the OS for an ephemeral port.
    #[arg(short, long, default_value_t = 4096)]
    port: u16,

    /// Server name used in logs and diagnostics.
    #[arg(short, long, default_value = "echo")]
    name: String,
}

/// Writes every received frame back to the peer.
struct EchoHandler;

impl ConnectionHandler for EchoHandler {
    fn handle(&self, mut conn: FramedConnection) -> BoxFuture<'static, io::Result<()>> {
        async move {
            while let Some(frame) = conn.recv().await? {
                conn.send(&frame).await?;
            }
            Ok(())
        }
        .boxed()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };

    observability::logging::init(&config.observability);

    tracing::info!(
        bind_host = %config.transport.bind_host,
        codec = %config.transport.codec,
        max_connections = config.transport.max_connections,
        "configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => observability::metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let mut server = TcpServer::builder(cli.name)
        .config(config)
        .port(cli.port)
        .pipeline(RawPipeline)
        .handler(EchoHandler)
        .metrics_factory(MetricsRecorderFactory)
        .build()?;

    server.start().await?;
    tracing::info!(port = server.bound_port()?, "echo server ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");

    server.stop().await;
    tracing::info!("shutdown complete");
    Ok(())
}
