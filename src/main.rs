#![forbid(unsafe_code)]

//! `zoning-lookup`: MCP zoning lookup server binary.
//!
//! Loads configuration, builds the upstream client, and serves the lookup
//! tools over HTTP (request/response and streaming) or stdio.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use zoning_lookup::arcgis::ArcGisClient;
use zoning_lookup::config::GlobalConfig;
use zoning_lookup::mcp::handler::AppState;
use zoning_lookup::mcp::{server, transport};
use zoning_lookup::session::reaper;
use zoning_lookup::{AppError, Result};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum Transport {
    /// Request/response and streaming HTTP surfaces.
    Http,
    /// Single session over stdin/stdout.
    Stdio,
}

#[derive(Debug, Parser)]
#[command(name = "zoning-lookup", about = "MCP zoning district lookup server", version, long_about = None)]
struct Cli {
    /// Path to an optional TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Transport to serve.
    #[arg(long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,

    /// Override the HTTP listening port.
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;
    info!("zoning-lookup server bootstrap");

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    // ── Load configuration ──────────────────────────────
    let mut config = GlobalConfig::load(args.config.as_deref()).inspect_err(|err| {
        error!(%err, "configuration rejected");
    })?;
    if let Some(port) = args.port {
        config.http_port = port;
    }
    let config = Arc::new(config);
    info!(
        feature_url = %config.feature_url,
        zoning_layer = %config.zoning_layer,
        address_layer = %config.address_layer,
        "configuration loaded"
    );

    // ── Build shared application state ──────────────────
    let client = ArcGisClient::from_config(&config)?;
    let state = Arc::new(AppState::new(Arc::clone(&config), Arc::new(client)));

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("shutdown signal received");
        signal_ct.cancel();
    });

    // ── Start transport ─────────────────────────────────
    match args.transport {
        Transport::Stdio => {
            transport::serve_stdio(state, ct.clone()).await?;
            ct.cancel();
        }
        Transport::Http => {
            let reaper_handle = reaper::spawn_session_reaper(
                Arc::clone(&state.sessions),
                config.session_idle_timeout(),
                ct.clone(),
            );
            info!("session reaper started");

            let result = server::serve_http(state, ct.clone()).await;
            ct.cancel();
            let _ = reaper_handle.await;
            result?;
        }
    }

    info!("zoning-lookup shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                tracing::warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
