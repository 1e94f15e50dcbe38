//! Network collaborator that executes a fully formed request.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Url;
use thiserror::Error;

use super::request::HttpMethod;
use crate::error::AuthError;

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Failures below the request/response abstraction.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,
    /// Return this when the underlying request was cancelled before a
    /// response arrived; it surfaces as [`AuthError::Network`] and nothing
    /// is committed.
    #[error("Request cancelled")]
    Cancelled,
    #[error("Connection failed: {0}")]
    Connection(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection(error.to_string())
        }
    }
}

impl From<TransportError> for AuthError {
    fn from(error: TransportError) -> Self {
        match error {
            TransportError::Timeout => AuthError::Timeout,
            other => AuthError::Network(other.to_string()),
        }
    }
}

/// Executes requests; implementations must be safe to share across tasks.
///
/// Retries are a caller concern and never happen at this layer. Custom
/// transports report cancelled requests as [`TransportError::Cancelled`].
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.into(), request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}
