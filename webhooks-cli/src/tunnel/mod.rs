//! Public tunnels to the local webhook server.

pub mod ngrok;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

pub use ngrok::NgrokTunnel;

#[derive(Error, Debug)]
pub enum TunnelError {
    #[error("failed to launch tunnel agent '{bin}': {source}")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tunnel agent exited before the tunnel was ready ({0})")]
    Exited(String),

    #[error("tunnel for port {port} was not ready after {waited_ms}ms")]
    StartTimeout { port: u16, waited_ms: u128 },

    #[error("invalid tunnel agent API URL: {0}")]
    ApiUrl(#[from] url::ParseError),

    #[error("tunnel agent API request failed: {0}")]
    Api(#[from] reqwest::Error),

    #[error("failed to stop tunnel agent: {0}")]
    Close(std::io::Error),
}

/// Something that can expose a local port at a public URL.
#[async_trait]
pub trait Tunnel: Send + Sync {
    /// Expose `port` and return its public URL.
    async fn open(&self, port: u16) -> Result<String, TunnelError>;

    /// Tear down the tunnel previously returned by [`Tunnel::open`].
    async fn close(&self, public_url: &str) -> Result<(), TunnelError>;
}

/// A tunnel the user already runs, given as `--public-url`.
#[derive(Debug, Clone)]
pub struct StaticTunnel {
    url: Url,
}

impl StaticTunnel {
    pub fn new(url: Url) -> Self {
        Self { url }
    }
}

#[async_trait]
impl Tunnel for StaticTunnel {
    async fn open(&self, port: u16) -> Result<String, TunnelError> {
        tracing::debug!(url = %self.url, port = port, "static_tunnel_in_use");
        Ok(self.url.to_string())
    }

    async fn close(&self, _public_url: &str) -> Result<(), TunnelError> {
        Ok(())
    }
}
