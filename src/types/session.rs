use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use super::user::User;

const DEFAULT_TOKEN_TYPE: &str = "Bearer";

/// Credential bundle representing an authenticated period.
///
/// The access token is the only required field. On the wire it may arrive as
/// either `access_token` or `token`; `access_token` wins when both are sent.
///
/// # Example
/// ```
/// use chrono::{Duration, Utc};
/// use restauth::types::Session;
///
/// let mut session = Session::new("access");
/// assert!(session.is_valid());
/// session.expires_at = Some(Utc::now() - Duration::minutes(1));
/// assert!(!session.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SessionWire")]
pub struct Session {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Lifetime in seconds, as reported by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Absolute expiry; independent of `expires_in`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

impl Session {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in: None,
            expires_at: None,
            token_type: None,
            user: None,
        }
    }

    /// `true` unless an absolute expiry is present and not in the future.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }

    /// Token type for presentation, defaulting to `Bearer`.
    pub fn token_type_or_default(&self) -> &str {
        self.token_type.as_deref().unwrap_or(DEFAULT_TOKEN_TYPE)
    }
}

#[derive(Deserialize)]
struct SessionWire {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default, deserialize_with = "timestamp::deserialize_optional")]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    user: Option<User>,
}

impl TryFrom<SessionWire> for Session {
    type Error = String;

    fn try_from(wire: SessionWire) -> Result<Self, Self::Error> {
        let access_token = wire
            .access_token
            .or(wire.token)
            .ok_or_else(|| "missing field `access_token`".to_string())?;
        Ok(Self {
            access_token,
            refresh_token: wire.refresh_token,
            expires_in: wire.expires_in,
            expires_at: wire.expires_at,
            token_type: wire.token_type,
            user: wire.user,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn accepts_either_token_field_name() {
        let a: Session = serde_json::from_str(r#"{"access_token":"abc"}"#).unwrap();
        let b: Session = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn access_token_wins_over_token() {
        let session: Session =
            serde_json::from_str(r#"{"token":"legacy","access_token":"current"}"#).unwrap();
        assert_eq!(session.access_token, "current");
    }

    #[test]
    fn missing_token_is_rejected() {
        let err = serde_json::from_str::<Session>(r#"{"refresh_token":"r"}"#).unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn validity_follows_absolute_expiry_only() {
        let now = Utc::now();
        let mut session = Session::new("t");
        session.expires_in = Some(-10);
        assert!(session.is_valid_at(now));

        session.expires_at = Some(now + Duration::seconds(30));
        assert!(session.is_valid_at(now));

        session.expires_at = Some(now);
        assert!(!session.is_valid_at(now));

        session.expires_at = Some(now - Duration::hours(1));
        assert!(!session.is_valid_at(now));
    }

    #[test]
    fn token_type_defaults_to_bearer() {
        let mut session = Session::new("t");
        assert_eq!(session.token_type_or_default(), "Bearer");
        session.token_type = Some("MAC".to_string());
        assert_eq!(session.token_type_or_default(), "MAC");
    }

    #[test]
    fn serialized_form_reads_back() {
        let mut session = Session::new("t");
        session.refresh_token = Some("r".to_string());
        session.expires_at = Some(Utc::now() + Duration::hours(1));
        session.user = Some(User::new("u-1"));
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"access_token\":\"t\""));
        assert!(!json.contains("token_type"));
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
