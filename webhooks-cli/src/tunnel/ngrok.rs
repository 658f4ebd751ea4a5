//! ngrok-backed tunnel.
//!
//! Launches the `ngrok` agent for the local port and polls the agent's local
//! inspection API until it reports a public URL for that port.

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, info, warn};
use url::Url;

use super::{Tunnel, TunnelError};

pub const DEFAULT_NGROK_API: &str = "http://127.0.0.1:4040";

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Response of `GET /api/tunnels` on the agent.
#[derive(Debug, Deserialize)]
pub struct TunnelList {
    #[serde(default)]
    pub tunnels: Vec<TunnelInfo>,
}

#[derive(Debug, Deserialize)]
pub struct TunnelInfo {
    pub public_url: String,
    #[serde(default)]
    pub config: TunnelConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct TunnelConfig {
    /// Local address the tunnel points at, e.g. `http://localhost:51234`
    #[serde(default)]
    pub addr: String,
}

/// Pick the public URL serving `port`, preferring https.
pub fn select_public_url(list: &TunnelList, port: u16) -> Option<String> {
    let suffix = format!(":{}", port);
    let candidates: Vec<&TunnelInfo> = list
        .tunnels
        .iter()
        .filter(|t| t.config.addr.ends_with(&suffix) || t.config.addr == port.to_string())
        .collect();

    candidates
        .iter()
        .find(|t| t.public_url.starts_with("https://"))
        .or_else(|| candidates.first())
        .map(|t| t.public_url.clone())
}

/// Poll the agent API until a tunnel for `port` shows up.
///
/// `timeout` bounds the whole wait, including a poll request the agent
/// accepts but never answers. When `agent` is given, an agent that exits
/// early fails the wait immediately instead of running into the timeout.
pub async fn wait_for_public_url(
    client: &Client,
    api_url: &Url,
    port: u16,
    timeout: Duration,
    agent: Option<&mut Child>,
) -> Result<String, TunnelError> {
    let endpoint = api_url.join("/api/tunnels")?;
    let started = Instant::now();

    match tokio::time::timeout(timeout, poll_public_url(client, &endpoint, port, agent)).await {
        Ok(result) => result,
        Err(_) => Err(TunnelError::StartTimeout {
            port,
            waited_ms: started.elapsed().as_millis(),
        }),
    }
}

async fn poll_public_url(
    client: &Client,
    endpoint: &Url,
    port: u16,
    mut agent: Option<&mut Child>,
) -> Result<String, TunnelError> {
    loop {
        if let Some(child) = agent.as_deref_mut() {
            match child.try_wait() {
                Ok(Some(status)) => return Err(TunnelError::Exited(status.to_string())),
                Ok(None) => {}
                Err(e) => return Err(TunnelError::Exited(e.to_string())),
            }
        }

        match fetch_tunnels(client, endpoint).await {
            Ok(list) => {
                if let Some(url) = select_public_url(&list, port) {
                    return Ok(url);
                }
                debug!(port = port, tunnels = list.tunnels.len(), "ngrok_tunnel_pending");
            }
            // The agent API is not up until the agent has started.
            Err(e) => debug!(error = %e, "ngrok_api_unavailable"),
        }

        sleep(POLL_INTERVAL).await;
    }
}

async fn fetch_tunnels(client: &Client, endpoint: &Url) -> Result<TunnelList, TunnelError> {
    let list = client
        .get(endpoint.clone())
        .send()
        .await?
        .error_for_status()?
        .json::<TunnelList>()
        .await?;
    Ok(list)
}

/// Tunnel provided by a locally launched ngrok agent.
pub struct NgrokTunnel {
    bin: String,
    api_url: Url,
    client: Client,
    start_timeout: Duration,
    agent: Mutex<Option<Child>>,
}

impl NgrokTunnel {
    pub fn new(bin: impl Into<String>, api_url: Url, client: Client, start_timeout: Duration) -> Self {
        Self {
            bin: bin.into(),
            api_url,
            client,
            start_timeout,
            agent: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Tunnel for NgrokTunnel {
    async fn open(&self, port: u16) -> Result<String, TunnelError> {
        let mut agent = self.agent.lock().await;

        debug!(bin = %self.bin, port = port, "ngrok_agent_starting");

        let mut child = Command::new(&self.bin)
            .arg("http")
            .arg(port.to_string())
            .args(["--log", "stdout"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TunnelError::Spawn {
                bin: self.bin.clone(),
                source,
            })?;

        match wait_for_public_url(
            &self.client,
            &self.api_url,
            port,
            self.start_timeout,
            Some(&mut child),
        )
        .await
        {
            Ok(url) => {
                info!(url = %url, port = port, "tunnel_created");
                *agent = Some(child);
                Ok(url)
            }
            Err(e) => {
                if let Err(kill_err) = child.kill().await {
                    warn!(error = %kill_err, "ngrok_agent_kill_failed");
                }
                Err(e)
            }
        }
    }

    async fn close(&self, public_url: &str) -> Result<(), TunnelError> {
        if let Some(mut child) = self.agent.lock().await.take() {
            child.kill().await.map_err(TunnelError::Close)?;
        }

        info!(url = %public_url, "tunnel_destroyed");
        Ok(())
    }
}
