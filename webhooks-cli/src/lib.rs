//! Webhooks - receive platform webhooks on a local machine.
//!
//! The `webhooks` binary:
//! - Starts a local relay server on a free port
//! - Exposes it publicly through a tunnel
//! - Registers the public URL as a platform webhook
//! - Prints incoming payloads and forwards them to local URLs
//!
//! ## Architecture
//!
//! ```text
//! Platform → Tunnel → Relay Server → forwarding rules → your app(s)
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod events;
pub mod lifecycle;
pub mod relay;
pub mod tunnel;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, Webhook, WebhookRegistry};
pub use config::Config;
pub use events::{EventCatalog, EventSelection, ALL_EVENTS};
pub use lifecycle::{shutdown_signal, Lifecycle};
pub use relay::{ForwardingRule, RelayConfig, RelayError, RelayServer, RuleMatcher};
pub use tunnel::{NgrokTunnel, StaticTunnel, Tunnel, TunnelError};
