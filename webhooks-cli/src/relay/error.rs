//! Errors raised while serving and relaying webhooks.

use std::net::SocketAddr;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("failed to read webhook body: {0}")]
    StreamRead(String),

    #[error("malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("failed to forward webhook to {url}: {source}")]
    ForwardDelivery {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to bind webhook server to {addr}: {source}")]
    ListenerBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("webhook server did not shut down cleanly: {0}")]
    ListenerClose(String),
}

/// Every request-scoped failure is answered with an empty 500.
impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}
