use bon::Builder;
use strum::{Display, EnumString};

/// HTTP verbs used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Everything the pipeline needs to issue one call against the base URL.
///
/// # Example
/// ```
/// use restauth::http::{HttpMethod, RequestDescriptor};
///
/// let request = RequestDescriptor::builder()
///     .path("/auth/user")
///     .method(HttpMethod::Get)
///     .requires_auth(true)
///     .build();
/// assert!(request.body.is_none());
/// ```
#[derive(Debug, Clone, Builder)]
pub struct RequestDescriptor {
    #[builder(into)]
    pub path: String,
    pub method: HttpMethod,
    #[builder(default)]
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    #[builder(default)]
    pub headers: Vec<(String, String)>,
    #[builder(default)]
    pub requires_auth: bool,
}

/// Optional query parameters and headers for passthrough calls.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}
