//! Configuration module.
//!
//! Command-line arguments cover what users change per run; timeouts and
//! limits come from environment variables with sensible defaults.

use std::env;
use std::net::{Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;
use url::Url;

use crate::cli::{Args, LogFormat};
use crate::events::EventCatalog;
use crate::relay::config::{
    DEFAULT_FORWARD_TIMEOUT_MS, DEFAULT_MAX_BODY_BYTES, DEFAULT_READ_TIMEOUT_MS,
};
use crate::relay::{ForwardingRule, RelayConfig, RuleMatcher};

/// Application configuration resolved from arguments and environment.
#[derive(Debug, Clone)]
pub struct Config {
    /// Platform API token
    pub token: String,

    /// Team the webhook is registered under
    pub team_id: Option<String>,

    /// Platform API base URL
    pub api_url: Url,

    /// Local port for the webhook server (0 = ephemeral)
    pub port: u16,

    /// Print every received payload
    pub log_payloads: bool,

    /// Debug-level logging
    pub debug: bool,

    pub log_format: LogFormat,

    /// Forwarding rules in command-line order
    pub forward_rules: Vec<ForwardingRule>,

    /// Event types subscribed to on top of the defaults
    pub extra_events: Vec<String>,

    /// Pre-existing public URL; skips launching ngrok
    pub public_url: Option<Url>,

    pub ngrok_bin: String,

    pub ngrok_api: Url,

    // =========================================================================
    // Limits and timeouts (environment)
    // =========================================================================

    /// Largest accepted webhook body in bytes
    pub max_body_bytes: usize,

    /// Time allowed to receive a webhook body, in milliseconds
    pub body_read_timeout_ms: u64,

    /// Time allowed for each forwarded request, in milliseconds
    pub forward_timeout_ms: u64,

    /// Time allowed for the tunnel to come up, in milliseconds
    pub tunnel_start_timeout_ms: u64,

    /// Timeout for platform API requests, in milliseconds
    pub request_timeout_ms: u64,
}

impl Config {
    /// Combine parsed arguments with environment tuning.
    pub fn from_args(args: Args) -> Self {
        Config {
            token: args.token,
            team_id: args.scope.filter(|s| !s.trim().is_empty()),
            api_url: args.api_url,
            port: args.port,
            log_payloads: !args.no_log,
            debug: args.debug,
            log_format: args.log_format,
            forward_rules: args.forward_to,
            extra_events: args.events,
            public_url: args.public_url,
            ngrok_bin: args.ngrok_bin,
            ngrok_api: args.ngrok_api,

            max_body_bytes: parse_env("MAX_BODY_BYTES", DEFAULT_MAX_BODY_BYTES),

            body_read_timeout_ms: parse_env("BODY_READ_TIMEOUT_MS", DEFAULT_READ_TIMEOUT_MS),

            forward_timeout_ms: parse_env("FORWARD_TIMEOUT_MS", DEFAULT_FORWARD_TIMEOUT_MS),

            tunnel_start_timeout_ms: parse_env("TUNNEL_START_TIMEOUT_MS", 15_000),

            request_timeout_ms: parse_env("REQUEST_TIMEOUT_MS", 8_000),
        }
    }

    /// Known event types, including any added with `--events`.
    pub fn catalog(&self) -> EventCatalog {
        let mut catalog = EventCatalog::new();
        for event in &self.extra_events {
            catalog.register(event.trim());
        }
        catalog
    }

    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, self.port)),
            log_payloads: self.log_payloads,
            rules: RuleMatcher::new(self.forward_rules.clone(), self.catalog()),
            max_body_bytes: self.max_body_bytes,
            read_timeout: Duration::from_millis(self.body_read_timeout_ms),
            forward_timeout: Duration::from_millis(self.forward_timeout_ms),
        }
    }
}

/// Parse an environment variable, falling back to `default` when it is unset
/// or invalid.
fn parse_env<T: FromStr>(name: &str, default: T) -> T {
    let raw = match env::var(name) {
        Ok(v) => v,
        Err(_) => return default,
    };

    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            warn!(env_var = name, value = %raw, "Invalid value, using default");
            default
        }
    }
}
