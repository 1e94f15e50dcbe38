//! On-disk envelope for the persisted session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AuthError, Result};
use crate::types::Session;

const PERSISTED_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    version: u32,
    session: Session,
    saved_at: DateTime<Utc>,
}

pub(crate) fn encode(session: &Session) -> Result<Vec<u8>> {
    let envelope = PersistedSession {
        version: PERSISTED_VERSION,
        session: session.clone(),
        saved_at: Utc::now(),
    };
    serde_json::to_vec(&envelope).map_err(AuthError::Encoding)
}

/// `None` for unreadable blobs or unknown versions.
pub(crate) fn decode(bytes: &[u8]) -> Option<Session> {
    match serde_json::from_slice::<PersistedSession>(bytes) {
        Ok(envelope) if envelope.version == PERSISTED_VERSION => Some(envelope.session),
        Ok(envelope) => {
            debug!(version = envelope.version, "ignoring persisted session with unknown version");
            None
        }
        Err(err) => {
            debug!(error = %err, "ignoring unreadable persisted session");
            None
        }
    }
}
