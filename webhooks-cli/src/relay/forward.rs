//! Outbound delivery of a webhook to forwarding targets.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};
use reqwest::Client;
use tracing::{debug, error, info, warn};

use super::error::RelayError;
use super::rules::ForwardingRule;

/// Copy the inbound headers that should travel with a forwarded webhook.
///
/// Headers describing the inbound connection rather than the webhook are
/// dropped; the client sets its own.
pub fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    for name in [
        header::HOST,
        header::CONTENT_LENGTH,
        header::CONNECTION,
        header::TRANSFER_ENCODING,
        header::TE,
        header::TRAILER,
        header::UPGRADE,
    ] {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
    headers
}

/// POST the raw webhook body to a single rule's URL.
pub async fn forward_webhook(
    client: &Client,
    rule: &ForwardingRule,
    headers: &HeaderMap,
    body: Bytes,
    timeout: Duration,
) -> Result<StatusCode, RelayError> {
    debug!(url = %rule.url, body_length = body.len(), "forward_starting");

    let response = client
        .post(rule.url.clone())
        .headers(headers.clone())
        .body(body)
        .timeout(timeout)
        .send()
        .await
        .map_err(|source| RelayError::ForwardDelivery {
            url: rule.url.to_string(),
            source,
        })?;

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        warn!(url = %rule.url, status_code = status.as_u16(), "forward_rejected");
    }

    Ok(status)
}

/// Forward to every rule concurrently and wait for all of them.
///
/// Returns the number of successful deliveries. A failing target is logged
/// and never prevents delivery to the others.
pub async fn forward_all(
    client: &Client,
    rules: &[&ForwardingRule],
    labels: &[String],
    event_type: &str,
    inbound: &HeaderMap,
    body: Bytes,
    timeout: Duration,
) -> usize {
    let headers = forwardable_headers(inbound);

    let deliveries: Vec<_> = rules
        .iter()
        .map(|rule| forward_webhook(client, rule, &headers, body.clone(), timeout))
        .collect();

    let results = futures::future::join_all(deliveries).await;

    let mut delivered = 0;
    for ((rule, label), result) in rules.iter().zip(labels).zip(results) {
        match result {
            Ok(status) => {
                delivered += 1;
                info!(
                    event_type = %event_type,
                    url = %rule.url,
                    events = %label,
                    status_code = status.as_u16(),
                    "webhook_forwarded"
                );
            }
            Err(e) => {
                let timed_out = matches!(
                    &e,
                    RelayError::ForwardDelivery { source, .. } if source.is_timeout()
                );
                if timed_out {
                    error!(
                        url = %rule.url,
                        timeout_seconds = timeout.as_secs_f64(),
                        error = %e,
                        "forward_timeout"
                    );
                } else {
                    error!(url = %rule.url, error = %e, "forward_failed");
                }
            }
        }
    }

    delivered
}
