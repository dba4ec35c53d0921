//! Outbound HTTP capability used by fetch-and-store.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, Request, StatusCode};
use reqwest::redirect::Policy;
use thiserror::Error;

/// Substring a client puts in its error message when it stopped at a
/// redirect but still has the redirect response to hand back.
pub const REDIRECT_SIGNAL: &str = "REDIRECT!!!";

#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct UpstreamError {
    pub message: String,
    /// Response received before the failure, if any.
    pub response: Option<UpstreamResponse>,
}

impl UpstreamError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            response: None,
        }
    }

    pub fn with_response(message: impl Into<String>, response: UpstreamResponse) -> Self {
        Self {
            message: message.into(),
            response: Some(response),
        }
    }

    pub fn is_redirect_signal(&self) -> bool {
        self.message.contains(REDIRECT_SIGNAL)
    }
}

#[async_trait]
pub trait UpstreamClient: Send + Sync + std::fmt::Debug {
    async fn send(&self, request: &Request<()>) -> Result<UpstreamResponse, UpstreamError>;
}

/// [`UpstreamClient`] backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// With `follow_redirects` off, 3xx responses are returned as-is.
    pub fn new(timeout: Duration, follow_redirects: bool) -> Result<Self, UpstreamError> {
        let policy = if follow_redirects {
            Policy::default()
        } else {
            Policy::none()
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(policy)
            .build()
            .map_err(|err| UpstreamError::new(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl UpstreamClient for ReqwestClient {
    async fn send(&self, request: &Request<()>) -> Result<UpstreamResponse, UpstreamError> {
        let url = request.uri().to_string();
        tracing::debug!(method = %request.method(), url = %url, "sending upstream request");
        let response = self
            .client
            .request(request.method().clone(), &url)
            .headers(request.headers().clone())
            .send()
            .await
            .map_err(|err| UpstreamError::new(err.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|err| UpstreamError::new(format!("failed to read upstream body: {err}")))?;

        Ok(UpstreamResponse {
            status,
            headers,
            body,
        })
    }
}
