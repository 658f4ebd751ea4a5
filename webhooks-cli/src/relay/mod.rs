//! Webhook relay server.
//!
//! Accepts webhook deliveries on a local port, optionally prints them, and
//! re-posts the raw body to every forwarding rule interested in the event.
//!
//! ## Flow
//!
//! ```text
//! inbound POST → read body → decode `type` → match rules → concurrent re-POSTs
//! ```

pub mod config;
pub mod error;
pub mod forward;
pub mod handlers;
pub mod payload;
pub mod rules;
pub mod server;

pub use config::RelayConfig;
pub use error::RelayError;
pub use forward::{forward_all, forward_webhook, forwardable_headers};
pub use handlers::{relay_webhook, RelayState};
pub use payload::InboundPayload;
pub use rules::{ForwardingRule, RuleMatcher, RuleParseError};
pub use server::{router, RelayServer, ServerState};
