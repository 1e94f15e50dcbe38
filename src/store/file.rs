use std::fs;
use std::io::Write;
#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use super::SecretStore;
use crate::error::AuthError;

/// Configuration for file-backed secret storage.
#[derive(Debug, Clone)]
pub struct SecretStoreConfig {
    pub base_dir: PathBuf,
}

impl SecretStoreConfig {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    pub fn default_dir() -> PathBuf {
        default_restauth_dir()
    }
}

/// File-backed store, one file per key, written atomically with owner-only
/// permissions on Unix.
///
/// # Example
/// ```no_run
/// use restauth::store::{FileSecretStore, SecretStore};
///
/// let store = FileSecretStore::new_default();
/// store.save("restauth.session", b"{}")?;
/// # Ok::<(), restauth::error::AuthError>(())
/// ```
#[derive(Debug, Clone)]
pub struct FileSecretStore {
    base_dir: PathBuf,
}

impl FileSecretStore {
    pub fn new(config: SecretStoreConfig) -> Self {
        Self {
            base_dir: config.base_dir,
        }
    }

    pub fn new_default() -> Self {
        Self {
            base_dir: default_restauth_dir(),
        }
    }

    fn secret_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(format!("{}.secret", normalize_key(key)))
    }
}

impl SecretStore for FileSecretStore {
    fn save(&self, key: &str, secret: &[u8]) -> Result<(), AuthError> {
        atomic_write(&self.secret_path(key), secret)
    }

    fn load(&self, key: &str) -> Result<Option<Vec<u8>>, AuthError> {
        let path = self.secret_path(key);
        match fs::read(&path) {
            Ok(data) => Ok(Some(data)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error("read", &path, err)),
        }
    }

    fn delete(&self, key: &str) -> Result<(), AuthError> {
        let path = self.secret_path(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error("delete", &path, err)),
        }
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> AuthError {
    AuthError::Custom(format!("failed to {action} {}: {err}", path.display()))
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<(), AuthError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|err| io_error("create", parent, err))?;
        }
    }

    let file_name = path
        .file_name()
        .ok_or_else(|| AuthError::Custom(format!("secret path {} has no file name", path.display())))?;

    let nonce = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let temp_name = format!(
        ".{}.tmp-{}-{nonce}",
        file_name.to_string_lossy(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    options.mode(0o600);

    let write_result = (|| -> std::io::Result<()> {
        let mut temp_file = options.open(&temp_path)?;
        temp_file.write_all(data)?;
        temp_file.sync_all()?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error("write", &temp_path, err));
    }

    if let Err(err) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(io_error("replace", path, err));
    }

    #[cfg(unix)]
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|err| io_error("restrict", path, err))?;

    Ok(())
}

fn default_restauth_dir() -> PathBuf {
    directories::UserDirs::new()
        .map(|dirs| dirs.home_dir().join(".restauth"))
        .unwrap_or_else(|| PathBuf::from(".restauth"))
}

fn normalize_key(value: &str) -> String {
    let trimmed = value.trim();
    let out: String = trimmed
        .chars()
        .map(|ch| {
            let lower = ch.to_ascii_lowercase();
            if lower.is_ascii_alphanumeric() || lower == '-' || lower == '.' {
                lower
            } else {
                '-'
            }
        })
        .collect();
    if out.trim_matches(['-', '.']).is_empty() {
        "default".to_string()
    } else {
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, FileSecretStore) {
        let dir = TempDir::new().unwrap();
        let store = FileSecretStore::new(SecretStoreConfig::new(dir.path().to_path_buf()));
        (dir, store)
    }

    #[test]
    fn secret_round_trip_works() {
        let (_dir, store) = temp_store();
        store.save("restauth.session", b"payload").unwrap();
        let loaded = store.load("restauth.session").unwrap().unwrap();
        assert_eq!(loaded, b"payload");
    }

    #[test]
    fn save_overwrites_and_leaves_no_temp_files() {
        let (dir, store) = temp_store();
        store.save("k", b"first").unwrap();
        store.save("k", b"second").unwrap();
        assert_eq!(store.load("k").unwrap().unwrap(), b"second");
        let has_tmp = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .any(|name| name.contains(".tmp-"));
        assert!(!has_tmp);
    }

    #[test]
    fn delete_removes_secret_and_tolerates_missing() {
        let (_dir, store) = temp_store();
        store.save("k", b"x").unwrap();
        store.delete("k").unwrap();
        assert!(store.load("k").unwrap().is_none());
        store.delete("k").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn secret_file_is_owner_only() {
        let (_dir, store) = temp_store();
        store.save("k", b"x").unwrap();
        let mode = fs::metadata(store.secret_path("k")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn keys_are_normalized_to_safe_file_names() {
        assert_eq!(normalize_key("Restauth.Session"), "restauth.session");
        assert_eq!(normalize_key("a/b c"), "a-b-c");
        assert_eq!(normalize_key("  "), "default");
        assert_eq!(normalize_key("../"), "default");
    }
}
