//! Inbound webhook handler.
//!
//! Every request, on any path, goes through the same steps:
//! 1. Read the full body
//! 2. Decode it and pull out the event `type`
//! 3. Optionally print the payload
//! 4. Forward the raw body to every matching rule, concurrently
//!
//! The handler has a single exit point: `Ok` becomes an empty 200 and any
//! [`RelayError`] becomes an empty 500.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, StatusCode},
};
use reqwest::Client;
use tracing::{debug, error, info};

use super::config::RelayConfig;
use super::error::RelayError;
use super::forward::forward_all;
use super::payload::InboundPayload;

/// Shared, read-only state for the relay handler.
#[derive(Clone)]
pub struct RelayState {
    pub config: Arc<RelayConfig>,
    pub client: Client,
}

impl RelayState {
    pub fn new(config: RelayConfig, client: Client) -> Self {
        Self {
            config: Arc::new(config),
            client,
        }
    }
}

/// Relay endpoint, mounted as the router fallback.
pub async fn relay_webhook(
    State(state): State<RelayState>,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, RelayError> {
    let result = handle_webhook(&state, &headers, body).await;

    if let Err(e) = &result {
        error!(error = %e, "webhook_relay_failed");
    }

    result
}

async fn handle_webhook(
    state: &RelayState,
    headers: &HeaderMap,
    body: Body,
) -> Result<StatusCode, RelayError> {
    let config = &state.config;

    let raw = read_body(body, config.max_body_bytes, config.read_timeout).await?;
    let payload = InboundPayload::decode(&raw)?;

    info!(
        event_type = %payload.event_type,
        body_length = raw.len(),
        "webhook_received"
    );

    if config.log_payloads {
        info!(
            event_type = %payload.event_type,
            payload = %payload.pretty(),
            "webhook_payload"
        );
    }

    let rules = config.rules.matching(&payload.event_type);
    if rules.is_empty() {
        debug!(event_type = %payload.event_type, "webhook_no_matching_rules");
        return Ok(StatusCode::OK);
    }

    let labels: Vec<String> = rules.iter().map(|rule| config.rules.label(rule)).collect();
    let delivered = forward_all(
        &state.client,
        &rules,
        &labels,
        &payload.event_type,
        headers,
        raw,
        config.forward_timeout,
    )
    .await;

    debug!(
        event_type = %payload.event_type,
        matched = rules.len(),
        delivered = delivered,
        "webhook_relay_complete"
    );

    Ok(StatusCode::OK)
}

/// Buffer the whole request body, bounded in size and time.
pub async fn read_body(body: Body, limit: usize, timeout: Duration) -> Result<Bytes, RelayError> {
    match tokio::time::timeout(timeout, axum::body::to_bytes(body, limit)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(RelayError::StreamRead(e.to_string())),
        Err(_) => Err(RelayError::StreamRead(format!(
            "timed out after {}ms",
            timeout.as_millis()
        ))),
    }
}
