//! Start-up and teardown of the relay server, tunnel and webhook.
//!
//! Resources are acquired in order (server → tunnel → webhook), each step
//! gating the next, and released in reverse. Every release step runs even if
//! an earlier one failed.

use anyhow::{Context, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::api::{Webhook, WebhookRegistry};
use crate::relay::{RelayConfig, RelayServer};
use crate::tunnel::Tunnel;

/// Owns everything the command acquires for one run.
pub struct Lifecycle {
    relay: RelayConfig,
    client: Client,
    events: Vec<String>,
    tunnel: Box<dyn Tunnel>,
    registry: Box<dyn WebhookRegistry>,

    server: Option<RelayServer>,
    tunnel_url: Option<String>,
    webhook: Option<Webhook>,
}

impl Lifecycle {
    pub fn new(
        relay: RelayConfig,
        client: Client,
        events: Vec<String>,
        tunnel: Box<dyn Tunnel>,
        registry: Box<dyn WebhookRegistry>,
    ) -> Self {
        Self {
            relay,
            client,
            events,
            tunnel,
            registry,
            server: None,
            tunnel_url: None,
            webhook: None,
        }
    }

    pub fn server(&self) -> Option<&RelayServer> {
        self.server.as_ref()
    }

    pub fn tunnel_url(&self) -> Option<&str> {
        self.tunnel_url.as_deref()
    }

    pub fn webhook(&self) -> Option<&Webhook> {
        self.webhook.as_ref()
    }

    /// Nothing is held any more.
    pub fn is_stopped(&self) -> bool {
        self.server.is_none() && self.tunnel_url.is_none() && self.webhook.is_none()
    }

    /// Acquire server, tunnel and webhook. Whatever was acquired before a
    /// failure stays held for [`Lifecycle::stop`] to release.
    pub async fn start(&mut self) -> Result<()> {
        self.start_until(&CancellationToken::new()).await
    }

    /// Like [`Lifecycle::start`], but stops acquiring once `shutdown` fires.
    ///
    /// Only opening the tunnel is abandoned mid-way. A registration already
    /// sent always runs to completion so its webhook is held for teardown.
    async fn start_until(&mut self, shutdown: &CancellationToken) -> Result<()> {
        let server = RelayServer::start(self.relay.clone(), self.client.clone())
            .await
            .context("Failed to start webhook server")?;
        let port = server.port();
        self.server = Some(server);

        let url = tokio::select! {
            url = self.tunnel.open(port) => url.context("Failed to open tunnel")?,
            _ = shutdown.cancelled() => return Ok(()),
        };
        self.tunnel_url = Some(url.clone());

        if shutdown.is_cancelled() {
            return Ok(());
        }

        let webhook = self
            .registry
            .register(&url, &self.events)
            .await
            .context("Failed to register webhook")?;
        self.webhook = Some(webhook);

        if shutdown.is_cancelled() {
            return Ok(());
        }

        self.announce().await;
        Ok(())
    }

    async fn announce(&self) {
        match self.registry.context_name().await {
            Ok(name) => info!(context = %name, "webhook_listening"),
            Err(e) => warn!(error = %e, "webhook_scope_lookup_failed"),
        }

        let rules = &self.relay.rules;
        for rule in rules.rules() {
            info!(url = %rule.url, events = %rules.label(rule), "webhook_forwarding_to");
        }
    }

    /// Release everything held, in reverse order of acquisition.
    ///
    /// Returns the number of release steps that failed.
    pub async fn stop(&mut self) -> usize {
        info!("webhook_listener_stopping");
        let mut failures = 0;

        if let Some(url) = self.tunnel_url.take() {
            if let Err(e) = self.tunnel.close(&url).await {
                error!(url = %url, error = %e, "tunnel_close_failed");
                failures += 1;
            }
        }

        if let Some(webhook) = self.webhook.take() {
            if let Err(e) = self.registry.unregister(&webhook.id).await {
                error!(webhook_id = %webhook.id, error = %e, "webhook_cleanup_failed");
                failures += 1;
            }
        }

        if let Some(mut server) = self.server.take() {
            if let Err(e) = server.stop().await {
                error!(error = %e, "webhook_server_stop_failed");
                failures += 1;
            }
        }

        failures
    }

    /// Start, wait for `shutdown`, then tear down.
    ///
    /// A start-up failure tears down whatever was acquired and returns the
    /// original error. A shutdown request during start-up skips the remaining
    /// steps and tears down. After a clean run, failed teardown steps are
    /// reported as an error.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        if let Err(e) = self.start_until(&shutdown).await {
            error!(error = %format!("{:#}", e), "webhook_listener_start_failed");
            let failures = self.stop().await;
            if failures > 0 {
                warn!(failures = failures, "webhook_listener_teardown_incomplete");
            }
            return Err(e);
        }

        shutdown.cancelled().await;

        let failures = self.stop().await;
        if failures > 0 {
            warn!(failures = failures, "webhook_listener_teardown_incomplete");
            anyhow::bail!("{} teardown step(s) failed", failures);
        }

        info!("webhook_listener_stopped");
        Ok(())
    }
}

/// Cancel `token` on the first of SIGINT, SIGTERM, SIGUSR1 or SIGUSR2
/// (Ctrl-C only on non-unix platforms).
pub async fn shutdown_signal(token: CancellationToken) {
    let received = tokio::select! {
        name = wait_for_signal() => name,
        _ = token.cancelled() => return,
    };

    info!(signal = received, "shutdown_signal_received");
    token.cancel();
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use std::future::Future;
    use std::pin::Pin;
    use tokio::signal::unix::{signal, SignalKind};

    let kinds = [
        ("SIGINT", SignalKind::interrupt()),
        ("SIGTERM", SignalKind::terminate()),
        ("SIGUSR1", SignalKind::user_defined1()),
        ("SIGUSR2", SignalKind::user_defined2()),
    ];

    let mut waits: Vec<Pin<Box<dyn Future<Output = &'static str> + Send>>> = Vec::new();
    for (name, kind) in kinds {
        match signal(kind) {
            Ok(mut stream) => waits.push(Box::pin(async move {
                stream.recv().await;
                name
            })),
            Err(e) => warn!(signal = name, error = %e, "signal_handler_install_failed"),
        }
    }

    if waits.is_empty() {
        return std::future::pending().await;
    }

    let (name, _, _) = futures::future::select_all(waits).await;
    name
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        Err(e) => {
            warn!(error = %e, "signal_handler_install_failed");
            std::future::pending().await
        }
    }
}
