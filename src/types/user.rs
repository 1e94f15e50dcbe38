use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::AnyJson;

/// Identity record returned by the backend.
///
/// Replaced wholesale on every user fetch or auth response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<BTreeMap<String, AnyJson>>,
}

impl User {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            phone: None,
            email_confirmed_at: None,
            phone_confirmed_at: None,
            created_at: None,
            updated_at: None,
            metadata: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// `/auth/user` answers either with the user itself or wrapped in `{user}`.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum UserEnvelope {
    Wrapped { user: User },
    Bare(User),
}

impl From<UserEnvelope> for User {
    fn from(envelope: UserEnvelope) -> Self {
        match envelope {
            UserEnvelope::Wrapped { user } | UserEnvelope::Bare(user) => user,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_full_record_with_metadata() {
        let user: User = serde_json::from_str(
            r#"{
                "id": "u-1",
                "email": "ada@example.com",
                "email_confirmed_at": "2024-05-01T10:00:00.123Z",
                "created_at": "2024-04-30T09:00:00Z",
                "metadata": {"plan": "pro", "seats": 3, "beta": true}
            }"#,
        )
        .unwrap();
        assert_eq!(user.id, "u-1");
        assert_eq!(user.email.as_deref(), Some("ada@example.com"));
        assert!(user.email_confirmed_at.is_some());
        let metadata = user.metadata.unwrap();
        assert_eq!(metadata["seats"], AnyJson::Integer(3));
        assert_eq!(metadata["beta"], AnyJson::Bool(true));
    }

    #[test]
    fn id_is_required() {
        assert!(serde_json::from_str::<User>(r#"{"email":"a@b.c"}"#).is_err());
    }

    #[test]
    fn envelope_accepts_wrapped_and_bare() {
        let wrapped: UserEnvelope = serde_json::from_str(r#"{"user":{"id":"u-1"}}"#).unwrap();
        let bare: UserEnvelope = serde_json::from_str(r#"{"id":"u-1"}"#).unwrap();
        assert_eq!(User::from(wrapped), User::from(bare));
    }
}
