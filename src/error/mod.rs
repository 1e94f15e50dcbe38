//! Error types for restauth.

pub mod server;

pub use server::ServerError;

use thiserror::Error;

/// Primary error type for every session and HTTP pipeline operation.
///
/// The set is closed: nothing else escapes the [`crate::session::SessionManager`]
/// or the [`crate::http::HttpClient`]. Status codes are never interpreted into
/// domain meanings here; inspect [`AuthError::server_error`] for that.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Encoding error: {0}")]
    Encoding(#[source] serde_json::Error),

    #[error("Decoding error: {0}")]
    Decoding(#[source] serde_json::Error),

    #[error("No active session")]
    NoSession,

    #[error("{0}")]
    Server(ServerError),

    #[error("{0}")]
    Custom(String),
}

impl AuthError {
    /// The parsed server error, if the backend rejected the request.
    pub fn server_error(&self) -> Option<&ServerError> {
        match self {
            Self::Server(err) => Some(err),
            _ => None,
        }
    }

    /// HTTP status of a server rejection.
    pub fn status_code(&self) -> Option<u16> {
        self.server_error().map(ServerError::status_code)
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

impl From<ServerError> for AuthError {
    fn from(error: ServerError) -> Self {
        Self::Server(error)
    }
}

impl From<crate::value::ValueError> for AuthError {
    fn from(error: crate::value::ValueError) -> Self {
        Self::Custom(error.to_string())
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AuthError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_a_description() {
        let decode_err = serde_json::from_str::<u8>("x").unwrap_err();
        let encode_err = serde_json::from_str::<u8>("y").unwrap_err();
        let cases = [
            AuthError::InvalidUrl("::".to_string()),
            AuthError::InvalidResponse("status 42".to_string()),
            AuthError::Network("connection refused".to_string()),
            AuthError::Timeout,
            AuthError::Encoding(encode_err),
            AuthError::Decoding(decode_err),
            AuthError::NoSession,
            AuthError::Server(ServerError::new(500, b"boom".to_vec())),
            AuthError::custom("keychain locked"),
        ];
        for err in cases {
            assert!(!err.to_string().is_empty());
        }
    }

    #[test]
    fn status_code_is_only_reported_for_server_errors() {
        let err = AuthError::from(ServerError::new(401, Vec::new()));
        assert_eq!(err.status_code(), Some(401));
        assert_eq!(AuthError::NoSession.status_code(), None);
    }
}
