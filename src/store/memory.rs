use std::collections::HashMap;
use std::sync::Mutex;

use super::SecretStore;
use crate::error::AuthError;

/// Process-local store; nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_secrets<R>(&self, f: impl FnOnce(&mut HashMap<String, Vec<u8>>) -> R) -> R {
        let mut secrets = self
            .secrets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut secrets)
    }
}

impl SecretStore for MemorySecretStore {
    fn save(&self, key: &str, secret: &[u8]) -> Result<(), AuthError> {
        self.with_secrets(|secrets| secrets.insert(key.to_string(), secret.to_vec()));
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        Ok(self.with_secrets(|secrets| secrets.get(key).cloned()))
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        self.with_secrets(|secrets| secrets.remove(key));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_load_delete() {
        let store = MemorySecretStore::new();
        assert!(store.load("k").unwrap().is_none());
        store.save("k", b"blob").unwrap();
        assert_eq!(store.load("k").unwrap().as_deref(), Some(&b"blob"[..]));
        store.delete("k").unwrap();
        store.delete("k").unwrap();
        assert!(store.load("k").unwrap().is_none());
    }
}
