//! Webhooks CLI - listen for platform webhooks and relay them locally.
//!
//! Starts a local server, tunnels it, registers the tunnel URL as a webhook,
//! and tears everything down again on SIGINT/SIGTERM/SIGUSR1/SIGUSR2.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webhooks::cli::{self, LogFormat};
use webhooks::{shutdown_signal, ApiClient, Config, Lifecycle, NgrokTunnel, StaticTunnel, Tunnel};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_args(cli::args());

    init_logging(&config);

    info!(
        api_url = %config.api_url,
        team_scoped = config.team_id.is_some(),
        port = config.port,
        log_payloads = config.log_payloads,
        forward_rules = config.forward_rules.len(),
        public_url_set = config.public_url.is_some(),
        "config_loaded"
    );

    // Shared HTTP client for forwarding, the API and the tunnel agent
    let client = Client::builder()
        .use_rustls_tls()
        .pool_max_idle_per_host(16)
        .build()
        .context("Failed to create HTTP client")?;

    let tunnel: Box<dyn Tunnel> = match &config.public_url {
        Some(url) => Box::new(StaticTunnel::new(url.clone())),
        None => Box::new(NgrokTunnel::new(
            config.ngrok_bin.clone(),
            config.ngrok_api.clone(),
            client.clone(),
            Duration::from_millis(config.tunnel_start_timeout_ms),
        )),
    };

    let api_http = Client::builder()
        .use_rustls_tls()
        .timeout(Duration::from_millis(config.request_timeout_ms))
        .build()
        .context("Failed to create API client")?;
    let registry = ApiClient::new(
        api_http,
        config.api_url.clone(),
        config.token.clone(),
        config.team_id.clone(),
    );

    let lifecycle = Lifecycle::new(
        config.relay_config(),
        client,
        config.catalog().events().to_vec(),
        tunnel,
        Box::new(registry),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    lifecycle.run(shutdown).await?;

    info!("webhook_listener_shutdown_complete");

    Ok(())
}

fn init_logging(config: &Config) {
    let default_level = if config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let (json, pretty) = match config.log_format {
        LogFormat::Json => (Some(fmt::layer().json().flatten_event(true)), None),
        LogFormat::Pretty => (None, Some(fmt::layer().with_target(false))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .init();
}
