#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use restauth::config::AuthConfig;
use restauth::error::AuthError;
use restauth::session::SessionManager;
use restauth::store::{MemorySecretStore, SecretStore};
use restauth::types::{AuthState, AuthStateChange};
use serde_json::{json, Value};
use wiremock::MockServer;

pub const STORAGE_KEY: &str = "restauth.session";

/// In-memory store whose writes and deletes can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemorySecretStore,
    fail_save: AtomicBool,
    fail_delete: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_saves(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        self.inner
            .load(key)
            .expect("memory load")
            .map(|bytes| serde_json::from_slice(&bytes).expect("stored blob is json"))
    }
}

impl SecretStore for FlakyStore {
    fn save(&self, key: &str, secret: &[u8]) -> Result<(), AuthError> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(AuthError::custom("keychain unavailable"));
        }
        self.inner.save(key, secret)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        self.inner.load(key)
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(AuthError::custom("keychain locked"));
        }
        self.inner.delete(key)
    }
}

pub fn config(server: &MockServer) -> AuthConfig {
    AuthConfig::new(server.uri())
}

pub async fn manager(server: &MockServer, store: Arc<dyn SecretStore>) -> SessionManager {
    let manager = SessionManager::new(config(server), store);
    manager.restored().await;
    manager
}

pub type Recorded = Arc<Mutex<Vec<AuthStateChange>>>;

/// Registers a listener that records every change it receives.
pub fn record(manager: &SessionManager) -> Recorded {
    let seen: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    manager.on_auth_state_change(move |change| sink.lock().expect("recorder").push(change));
    seen
}

pub fn states(recorded: &Recorded) -> Vec<AuthState> {
    recorded
        .lock()
        .expect("recorder")
        .iter()
        .map(|change| change.state)
        .collect()
}

pub fn user_json(id: &str, email: &str) -> Value {
    json!({ "id": id, "email": email })
}

pub fn nested_auth_json(access: &str, refresh: &str) -> Value {
    json!({
        "user": user_json("u-1", "ada@example.com"),
        "session": {
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": 3600,
            "token_type": "bearer"
        }
    })
}
