//! Relay server lifecycle: bind, serve, graceful stop.

use std::net::SocketAddr;

use axum::Router;
use reqwest::Client;
use tokio::{net::TcpListener, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use super::config::RelayConfig;
use super::error::RelayError;
use super::handlers::{relay_webhook, RelayState};

/// Where a [`RelayServer`] is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Listening,
    Stopping,
}

/// Build the relay router. Every method and path reaches the relay handler.
pub fn router(state: RelayState) -> Router {
    Router::new()
        .fallback(relay_webhook)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A running webhook listener.
#[derive(Debug)]
pub struct RelayServer {
    addr: SocketAddr,
    state: ServerState,
    shutdown: CancellationToken,
    task: Option<JoinHandle<std::io::Result<()>>>,
}

impl RelayServer {
    /// Bind the listener and start serving in a background task.
    ///
    /// On bind failure no server is returned, so a `RelayServer` that exists
    /// has always reached [`ServerState::Listening`].
    pub async fn start(config: RelayConfig, client: Client) -> Result<Self, RelayError> {
        let requested = config.bind_addr;
        debug!(address = %requested, state = ?ServerState::Starting, "webhook_server_starting");

        let listener = TcpListener::bind(requested)
            .await
            .map_err(|source| RelayError::ListenerBind {
                addr: requested,
                source,
            })?;
        let addr = listener
            .local_addr()
            .map_err(|source| RelayError::ListenerBind {
                addr: requested,
                source,
            })?;

        let app = router(RelayState::new(config, client));
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone().cancelled_owned();

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(signal)
                .await
        });

        info!(address = %addr, "webhook_server_listening");

        Ok(Self {
            addr,
            state: ServerState::Listening,
            shutdown,
            task: Some(task),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    /// Stop accepting connections and wait for in-flight requests to finish.
    ///
    /// The server is `Stopped` afterwards even if the serve task reported an
    /// error; that error is returned to the caller.
    pub async fn stop(&mut self) -> Result<(), RelayError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        self.state = ServerState::Stopping;
        debug!(address = %self.addr, "webhook_server_stopping");
        self.shutdown.cancel();

        let result = match task.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(RelayError::ListenerClose(e.to_string())),
            Err(e) => Err(RelayError::ListenerClose(e.to_string())),
        };

        self.state = ServerState::Stopped;
        info!(address = %self.addr, "webhook_server_stopped");

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn config_on(port: u16) -> RelayConfig {
        RelayConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, port)),
            ..RelayConfig::default()
        }
    }

    #[tokio::test]
    async fn test_start_on_ephemeral_port() {
        let mut server = RelayServer::start(config_on(0), Client::new()).await.unwrap();

        assert_eq!(server.state(), ServerState::Listening);
        assert_ne!(server.port(), 0);

        server.stop().await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mut server = RelayServer::start(config_on(0), Client::new()).await.unwrap();

        server.stop().await.unwrap();
        server.stop().await.unwrap();
        assert_eq!(server.state(), ServerState::Stopped);
    }

    #[tokio::test]
    async fn test_bind_failure() {
        let taken = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = RelayServer::start(config_on(port), Client::new())
            .await
            .unwrap_err();

        assert!(matches!(err, RelayError::ListenerBind { .. }));
    }

    #[tokio::test]
    async fn test_refuses_connections_after_stop() {
        let mut server = RelayServer::start(config_on(0), Client::new()).await.unwrap();
        let url = format!("http://{}/", server.local_addr());

        let response = Client::new()
            .post(&url)
            .body(r#"{"type":"domain.created"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        server.stop().await.unwrap();

        assert!(Client::new().post(&url).body("{}").send().await.is_err());
    }
}
