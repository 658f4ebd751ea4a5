//! Relay server settings, fixed at construction.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use super::rules::RuleMatcher;

pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 30_000;
pub const DEFAULT_FORWARD_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Address to listen on; port 0 picks an ephemeral port
    pub bind_addr: SocketAddr,

    /// Print every decoded payload
    pub log_payloads: bool,

    /// Forwarding rules, in the order they were given
    pub rules: RuleMatcher,

    /// Largest accepted request body
    pub max_body_bytes: usize,

    /// Time allowed to receive a full request body
    pub read_timeout: Duration,

    /// Time allowed for each forwarded request
    pub forward_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 0)),
            log_payloads: true,
            rules: RuleMatcher::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            forward_timeout: Duration::from_millis(DEFAULT_FORWARD_TIMEOUT_MS),
        }
    }
}
