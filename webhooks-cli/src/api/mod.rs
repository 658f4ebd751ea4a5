//! Platform API: webhook registration.
//!
//! This module provides:
//! - Request/response types for the REST endpoints
//! - An authenticated client that registers and removes webhooks

pub mod client;
pub mod types;

use async_trait::async_trait;
use thiserror::Error;

pub use client::{ApiClient, DEFAULT_API_URL};
pub use types::Webhook;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid API URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("API request failed with status {status}: {message}")]
    Api { status: u16, message: String },
}

/// Registers the public tunnel URL as a webhook endpoint.
#[async_trait]
pub trait WebhookRegistry: Send + Sync {
    async fn register(&self, url: &str, events: &[String]) -> Result<Webhook, ApiError>;

    async fn unregister(&self, id: &str) -> Result<(), ApiError>;

    /// Account or team name the webhook is registered under.
    async fn context_name(&self) -> Result<String, ApiError>;
}
