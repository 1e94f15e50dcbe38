//! Auth envelopes and state-change notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::session::Session;
use super::timestamp;
use super::user::User;

/// Result of sign-up, sign-in, OTP verification and password operations.
///
/// Two wire shapes decode into this type: a nested `session` object, or flat
/// token fields at the root next to `user`. When both are present the nested
/// session wins. A session that carries no user of its own inherits the root
/// user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "AuthResponseWire")]
pub struct AuthResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

#[derive(Deserialize)]
struct AuthResponseWire {
    #[serde(default)]
    user: Option<User>,
    #[serde(default)]
    session: Option<Session>,
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
}

impl From<AuthResponseWire> for AuthResponse {
    fn from(wire: AuthResponseWire) -> Self {
        let session = match wire.session {
            Some(nested) => Some(nested),
            None => wire.access_token.or(wire.token).map(|access_token| Session {
                access_token,
                refresh_token: wire.refresh_token,
                expires_in: wire.expires_in,
                expires_at: wire.expires_at,
                token_type: wire.token_type,
                user: None,
            }),
        };
        let session = session.map(|mut session| {
            if session.user.is_none() {
                session.user = wire.user.clone();
            }
            session
        });
        Self {
            user: wire.user,
            session,
        }
    }
}

/// Transition label attached to every notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuthState {
    /// Current state delivered on startup and on listener registration.
    InitialSession,
    SignedIn,
    SignedOut,
    /// Nothing has been published yet.
    Unknown,
}

/// A transition paired with the session current at that moment.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthStateChange {
    pub state: AuthState,
    pub session: Option<Session>,
}

impl AuthStateChange {
    pub fn new(state: AuthState, session: Option<Session>) -> Self {
        Self { state, session }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn nested_and_flat_shapes_produce_the_same_session() {
        let nested: AuthResponse = serde_json::from_str(
            r#"{
                "user": {"id": "u-1", "email": "ada@example.com"},
                "session": {"access_token": "acc", "refresh_token": "ref", "expires_in": 3600}
            }"#,
        )
        .unwrap();
        let flat: AuthResponse = serde_json::from_str(
            r#"{
                "user": {"id": "u-1", "email": "ada@example.com"},
                "token": "acc",
                "refresh_token": "ref",
                "expires_in": 3600
            }"#,
        )
        .unwrap();
        assert_eq!(nested, flat);
        let session = flat.session.unwrap();
        assert_eq!(session.access_token, "acc");
        assert_eq!(session.user.map(|u| u.id).as_deref(), Some("u-1"));
    }

    #[test]
    fn nested_session_wins_over_flat_fields() {
        let response: AuthResponse = serde_json::from_str(
            r#"{"session": {"access_token": "nested"}, "access_token": "flat"}"#,
        )
        .unwrap();
        assert_eq!(response.session.unwrap().access_token, "nested");
    }

    #[test]
    fn nested_session_keeps_its_own_user() {
        let response: AuthResponse = serde_json::from_str(
            r#"{"user": {"id": "root"}, "session": {"access_token": "a", "user": {"id": "inner"}}}"#,
        )
        .unwrap();
        assert_eq!(response.session.unwrap().user.unwrap().id, "inner");
    }

    #[test]
    fn user_only_response_has_no_session() {
        let response: AuthResponse =
            serde_json::from_str(r#"{"user": {"id": "u-1"}, "session": null}"#).unwrap();
        assert!(response.session.is_none());
        assert_eq!(response.user.unwrap().id, "u-1");
    }

    #[test]
    fn auth_state_labels_are_snake_case() {
        assert_eq!(AuthState::InitialSession.to_string(), "initial_session");
        assert_eq!("signed_out".parse::<AuthState>().unwrap(), AuthState::SignedOut);
    }
}
