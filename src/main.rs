//! Ollama logging proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!   Caller ──▶ axum catch-all ──▶ body capture ──▶ request log
//!                                                     │
//!                                                     ▼
//!   Caller ◀── streamed body ◀── response log ◀── forward (hyper client) ──▶ Upstream
//!                    │
//!                    └── on transport failure: 502 Bad Gateway + error log
//! ```
//!
//! Configuration comes from defaults, an optional TOML file, the
//! `PROXY_PORT` / `OLLAMA_URL` environment variables, and CLI flags, in
//! increasing order of precedence.

use clap::Parser;
use std::path::PathBuf;

use ollama_proxy::config::{resolve_config, Overrides};
use ollama_proxy::lifecycle::{wait_for_signal, Shutdown};
use ollama_proxy::{net, observability, HttpServer, ProxyError};

#[derive(Parser)]
#[command(name = "ollama-proxy")]
#[command(about = "Transparent logging proxy in front of a single upstream HTTP service", long_about = None)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. ":8080" (overrides PROXY_PORT)
    #[arg(short, long)]
    listen: Option<String>,

    /// Upstream base URL (overrides OLLAMA_URL)
    #[arg(short, long)]
    upstream: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), ProxyError> {
    let cli = Cli::parse();
    let overrides = Overrides {
        listen: cli.listen,
        upstream: cli.upstream,
    };

    let config = match resolve_config(cli.config.as_deref(), &overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    observability::init(&config.observability);

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.url,
        connect_timeout_secs = ?config.timeouts.connect_secs,
        response_header_timeout_secs = ?config.timeouts.response_header_secs,
        "Configuration loaded"
    );

    let listener = net::bind(&config.listener).await?;
    let server = HttpServer::new(&config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
