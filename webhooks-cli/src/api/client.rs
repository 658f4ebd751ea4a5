//! REST client for the platform's webhook endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, info};
use url::Url;

use super::types::{CreateWebhookRequest, ErrorResponse, Team, UserResponse, Webhook};
use super::{ApiError, WebhookRegistry};

pub const DEFAULT_API_URL: &str = "https://api.vercel.com";

/// Authenticated API client, cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: Client,
    base_url: Url,
    token: String,
    team_id: Option<String>,
}

impl ApiClient {
    pub fn new(http: Client, base_url: Url, token: String, team_id: Option<String>) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                http,
                base_url,
                token,
                team_id,
            }),
        }
    }

    /// Build a request for the path `segments` below the base URL, scoped to
    /// the configured team if any. Segments are percent-encoded.
    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .pop_if_empty()
            .extend(segments);
        if let Some(team_id) = &self.inner.team_id {
            url.query_pairs_mut().append_pair("teamId", team_id);
        }

        debug!(method = %method, url = %url, "api_request");

        Ok(self
            .inner
            .http
            .request(method, url)
            .bearer_auth(&self.inner.token))
    }

    /// Turn a non-2xx response into [`ApiError::Api`].
    async fn check(response: Response) -> Result<Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorResponse>(&text) {
            Ok(body) => body.error.message,
            Err(_) if text.is_empty() => status.canonical_reason().unwrap_or("request failed").to_string(),
            Err(_) => text,
        };

        Err(ApiError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ApiError> {
        let response = Self::check(request.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    /// Create a webhook delivering `events` to `url`.
    pub async fn create_webhook(&self, url: &str, events: &[String]) -> Result<Webhook, ApiError> {
        let request = self
            .request(Method::POST, &["v1", "webhooks"])?
            .json(&CreateWebhookRequest { url, events });
        let webhook: Webhook = Self::json(request).await?;

        info!(webhook_id = %webhook.id, url = %url, "webhook_created");
        Ok(webhook)
    }

    pub async fn delete_webhook(&self, id: &str) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &["v1", "webhooks", id])?;
        Self::check(request.send().await?).await?;

        info!(webhook_id = %id, "webhook_deleted");
        Ok(())
    }

    /// Name of the account the webhook is registered under: the team slug
    /// when scoped to a team, otherwise the username.
    pub async fn context_name(&self) -> Result<String, ApiError> {
        match self.inner.team_id.as_deref() {
            Some(team_id) => {
                let request = self.request(Method::GET, &["v2", "teams", team_id])?;
                let team: Team = Self::json(request).await?;
                Ok(team.slug)
            }
            None => {
                let request = self.request(Method::GET, &["v2", "user"])?;
                let body: UserResponse = Self::json(request).await?;
                Ok(body.user.username)
            }
        }
    }
}

#[async_trait]
impl WebhookRegistry for ApiClient {
    async fn register(&self, url: &str, events: &[String]) -> Result<Webhook, ApiError> {
        self.create_webhook(url, events).await
    }

    async fn unregister(&self, id: &str) -> Result<(), ApiError> {
        self.delete_webhook(id).await
    }

    async fn context_name(&self) -> Result<String, ApiError> {
        ApiClient::context_name(self).await
    }
}
