//! Request and response bodies for the platform REST API.

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/webhooks`.
#[derive(Debug, Clone, Serialize)]
pub struct CreateWebhookRequest<'a> {
    pub url: &'a str,
    pub events: &'a [String],
}

/// A webhook registered with the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Webhook {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub events: Vec<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
}

impl Webhook {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url: None,
            events: Vec::new(),
            created_at: None,
        }
    }
}

/// Body of `GET /v2/user`.
#[derive(Debug, Deserialize)]
pub struct UserResponse {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub username: String,
}

/// Body of `GET /v2/teams/{teamId}`.
#[derive(Debug, Deserialize)]
pub struct Team {
    pub slug: String,
}

/// Error envelope returned on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_deserialization() {
        let json = r#"{
            "id": "hook_abc",
            "url": "https://abc.ngrok.io",
            "events": ["deployment.created"],
            "createdAt": 1700000000000,
            "ownerId": "team_1"
        }"#;

        let webhook: Webhook = serde_json::from_str(json).unwrap();
        assert_eq!(webhook.id, "hook_abc");
        assert_eq!(webhook.events, vec!["deployment.created".to_string()]);
        assert_eq!(webhook.created_at, Some(1_700_000_000_000));
    }

    #[test]
    fn test_webhook_minimal() {
        let webhook: Webhook = serde_json::from_str(r#"{"id":"hook_1"}"#).unwrap();
        assert_eq!(webhook, Webhook::new("hook_1"));
    }

    #[test]
    fn test_create_request_serialization() {
        let events = vec!["domain.created".to_string()];
        let body = CreateWebhookRequest {
            url: "https://abc.ngrok.io",
            events: &events,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "url": "https://abc.ngrok.io", "events": ["domain.created"] })
        );
    }
}
