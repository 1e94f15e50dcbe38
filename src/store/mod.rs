//! Durable storage for the serialized session blob.

pub mod file;
pub mod memory;

pub use file::{FileSecretStore, SecretStoreConfig};
pub use memory::MemorySecretStore;

use crate::error::AuthError;

/// Opaque key/value secret storage.
///
/// Implementations serialize their own internal access; the session manager
/// calls them sequentially. Failures are reported as [`AuthError::Custom`].
///
/// The startup load runs on the blocking pool; `save` and `delete` run inline
/// on the calling task and should return quickly.
pub trait SecretStore: Send + Sync {
    fn save(&self, key: &str, secret: &[u8]) -> Result<(), AuthError>;
    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError>;
    /// Deleting a missing entry is not an error.
    fn delete(&self, key: &str) -> Result<(), AuthError>;
}
