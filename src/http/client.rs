use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::codec::JsonCodec;
use super::request::RequestDescriptor;
use super::transport::{Transport, TransportRequest};
use crate::error::{AuthError, Result, ServerError};
use crate::util::timeout::with_timeout;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Request pipeline bound to one base URL.
///
/// Success means a 2xx status. Anything else becomes
/// [`AuthError::Server`] before the body is ever decoded.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use restauth::http::{HttpClient, HttpMethod, RequestDescriptor, ReqwestTransport};
///
/// # async fn example() -> restauth::error::Result<()> {
/// let client = HttpClient::new("https://api.example.com", Arc::new(ReqwestTransport::new()));
/// let request = RequestDescriptor::builder()
///     .path("/health")
///     .method(HttpMethod::Get)
///     .build();
/// client.execute_empty(&request, None).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct HttpClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    codec: JsonCodec,
    default_headers: Vec<(String, String)>,
    timeout: Duration,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .field("codec", &self.codec)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, transport: Arc<dyn Transport>) -> Self {
        Self {
            base_url: base_url.into(),
            transport,
            codec: JsonCodec::default(),
            default_headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Headers added to every request; per-request headers override them.
    pub fn with_default_headers(mut self, headers: Vec<(String, String)>) -> Self {
        self.default_headers = headers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join the base URL, a relative path and query parameters.
    pub fn compose_url(&self, path: &str, query: &[(String, String)]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|err| AuthError::InvalidUrl(format!("{}: {err}", self.base_url)))?;
        if url.cannot_be_a_base() {
            return Err(AuthError::InvalidUrl(format!(
                "{} cannot be used as a base URL",
                self.base_url
            )));
        }
        if path.contains(['?', '#']) || path.contains("://") || path.contains(char::is_whitespace)
        {
            return Err(AuthError::InvalidUrl(format!("malformed path: {path:?}")));
        }
        let joined = format!(
            "{}/{}",
            url.path().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        url.set_path(&joined);
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Execute and decode a 2xx body into `T`.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
        bearer: Option<&str>,
    ) -> Result<T> {
        let body = self.send(request, bearer).await?;
        self.codec.decode(&body)
    }

    /// Execute and only check the status class.
    pub async fn execute_empty(&self, request: &RequestDescriptor, bearer: Option<&str>) -> Result<()> {
        self.send(request, bearer).await.map(|_| ())
    }

    async fn send(&self, request: &RequestDescriptor, bearer: Option<&str>) -> Result<Vec<u8>> {
        let url = self.compose_url(&request.path, &request.query)?;
        let bearer = bearer.filter(|_| request.requires_auth);
        let headers = self.build_headers(request, bearer)?;
        let body = request
            .body
            .as_ref()
            .map(|body| self.codec.encode(body))
            .transpose()?;

        debug!(
            method = %request.method,
            url = %url,
            authenticated = bearer.is_some(),
            "dispatching request"
        );
        let response = with_timeout(
            self.timeout,
            self.transport.execute(TransportRequest {
                method: request.method,
                url,
                headers,
                body,
            }),
        )
        .await?;

        if !(100..=599).contains(&response.status) {
            return Err(AuthError::InvalidResponse(format!(
                "status code {} out of range",
                response.status
            )));
        }
        if !(200..300).contains(&response.status) {
            debug!(status = response.status, path = %request.path, "request rejected");
            return Err(ServerError::new(response.status, response.body).into());
        }
        Ok(response.body)
    }

    fn build_headers(&self, request: &RequestDescriptor, bearer: Option<&str>) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if request.body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        for (name, value) in self.default_headers.iter().chain(&request.headers) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| AuthError::custom(format!("invalid header name: {name}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| AuthError::custom(format!("invalid value for header {name}")))?;
            headers.insert(name, value);
        }
        if let Some(token) = bearer {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| AuthError::custom("access token is not a valid header value"))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::ReqwestTransport;

    fn client(base: &str) -> HttpClient {
        HttpClient::new(base, Arc::new(ReqwestTransport::new()))
    }

    #[test]
    fn compose_url_keeps_base_path() {
        let url = client("https://api.example.com/v1/")
            .compose_url("/auth/signin", &[])
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/v1/auth/signin");
    }

    #[test]
    fn compose_url_encodes_query() {
        let url = client("https://api.example.com")
            .compose_url(
                "items",
                &[("q".to_string(), "a b".to_string()), ("page".to_string(), "2".to_string())],
            )
            .unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/items?q=a+b&page=2");
    }

    #[test]
    fn compose_url_rejects_bad_inputs() {
        assert!(matches!(
            client("not a url").compose_url("/x", &[]),
            Err(AuthError::InvalidUrl(_))
        ));
        assert!(matches!(
            client("mailto:someone@example.com").compose_url("/x", &[]),
            Err(AuthError::InvalidUrl(_))
        ));
        assert!(matches!(
            client("https://api.example.com").compose_url("/x?y=1", &[]),
            Err(AuthError::InvalidUrl(_))
        ));
        assert!(matches!(
            client("https://api.example.com").compose_url("https://evil.example.com", &[]),
            Err(AuthError::InvalidUrl(_))
        ));
    }

    #[test]
    fn bearer_header_uses_bearer_scheme() {
        let c = client("https://api.example.com");
        let request = RequestDescriptor::builder()
            .path("/a")
            .method(crate::http::HttpMethod::Get)
            .requires_auth(true)
            .build();
        let headers = c.build_headers(&request, None).unwrap();
        assert!(headers.get(AUTHORIZATION).is_none());

        let headers = c.build_headers(&request, Some("tok")).unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
        assert!(headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[test]
    fn request_headers_override_defaults() {
        let c = client("https://api.example.com")
            .with_default_headers(vec![("x-api-key".to_string(), "default".to_string())]);
        let request = RequestDescriptor::builder()
            .path("/a")
            .method(crate::http::HttpMethod::Get)
            .headers(vec![("x-api-key".to_string(), "override".to_string())])
            .build();
        let headers = c.build_headers(&request, None).unwrap();
        assert_eq!(headers.get("x-api-key").unwrap(), "override");
    }
}
