//! Structured view of a non-2xx response.

use std::collections::BTreeMap;
use std::fmt;

use crate::value::AnyJson;

/// A rejected request, parsed on a best-effort basis.
///
/// Construction never fails: when the body is not a JSON object, the
/// `error`/`message`/`code` fields are `None` and only the status and the
/// raw bytes are available.
///
/// # Example
/// ```
/// use restauth::error::ServerError;
///
/// let err = ServerError::new(404, br#"{"error":"user_not_found","message":"No account"}"#.to_vec());
/// assert_eq!(err.status_code(), 404);
/// assert_eq!(err.error(), Some("user_not_found"));
/// assert_eq!(err.message(), Some("No account"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ServerError {
    status_code: u16,
    error: Option<String>,
    message: Option<String>,
    code: Option<String>,
    fields: BTreeMap<String, AnyJson>,
    raw: Vec<u8>,
}

impl ServerError {
    pub fn new(status_code: u16, raw: Vec<u8>) -> Self {
        let fields = parse_fields(&raw);
        Self {
            status_code,
            error: string_field(&fields, "error"),
            message: string_field(&fields, "message"),
            code: string_field(&fields, "code"),
            fields,
            raw,
        }
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// The response body exactly as received.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Look up any top-level field of the decoded body.
    pub fn field(&self, key: &str) -> Option<&AnyJson> {
        self.fields.get(key)
    }

    /// All top-level fields that could be represented.
    pub fn fields(&self) -> &BTreeMap<String, AnyJson> {
        &self.fields
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Server error (status {})", self.status_code)?;
        match (self.message(), self.error()) {
            (Some(message), _) => write!(f, ": {message}"),
            (None, Some(error)) => write!(f, ": {error}"),
            (None, None) => Ok(()),
        }
    }
}

impl std::error::Error for ServerError {}

// Entries that cannot be represented (e.g. `null`) are skipped rather than
// discarding the whole object.
fn parse_fields(raw: &[u8]) -> BTreeMap<String, AnyJson> {
    match serde_json::from_slice::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .into_iter()
            .filter_map(|(key, value)| AnyJson::try_from(value).ok().map(|v| (key, v)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn string_field(fields: &BTreeMap<String, AnyJson>, key: &str) -> Option<String> {
    match fields.get(key)? {
        AnyJson::String(s) => Some(s.clone()),
        AnyJson::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_body_populates_known_fields() {
        let err = ServerError::new(
            404,
            br#"{"error":"user_not_found","message":"No account"}"#.to_vec(),
        );
        assert_eq!(err.status_code(), 404);
        assert_eq!(err.error(), Some("user_not_found"));
        assert_eq!(err.message(), Some("No account"));
        assert_eq!(err.code(), None);
    }

    #[test]
    fn non_json_body_keeps_status_and_raw_bytes() {
        let body = b"<html>Internal Server Error</html>".to_vec();
        let err = ServerError::new(500, body.clone());
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.error(), None);
        assert_eq!(err.message(), None);
        assert_eq!(err.code(), None);
        assert!(err.fields().is_empty());
        assert_eq!(err.raw(), body.as_slice());
    }

    #[test]
    fn json_array_body_is_not_treated_as_fields() {
        let err = ServerError::new(400, b"[1,2]".to_vec());
        assert!(err.fields().is_empty());
        assert_eq!(err.raw(), b"[1,2]");
    }

    #[test]
    fn arbitrary_fields_are_reachable_and_nulls_skipped() {
        let err = ServerError::new(
            422,
            br#"{"code":1001,"details":{"field":"email"},"hint":null}"#.to_vec(),
        );
        assert_eq!(err.code(), Some("1001"));
        assert_eq!(
            err.field("details")
                .and_then(|d| d.get("field"))
                .and_then(AnyJson::as_str),
            Some("email")
        );
        assert!(err.field("hint").is_none());
        assert_eq!(err.fields().len(), 2);
    }

    #[test]
    fn display_prefers_message_over_error() {
        let err = ServerError::new(401, br#"{"error":"bad","message":"Bad creds"}"#.to_vec());
        assert_eq!(err.to_string(), "Server error (status 401): Bad creds");
        let bare = ServerError::new(503, Vec::new());
        assert_eq!(bare.to_string(), "Server error (status 503)");
    }
}
