//! Configuration (layered: code > env > TOML file).

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::http::KeyConvention;

pub const DEFAULT_STORAGE_KEY: &str = "restauth.session";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Endpoint paths, relative to the base URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthPaths {
    pub sign_up: String,
    pub sign_in: String,
    pub sign_out: String,
    pub user: String,
    pub resend_otp: String,
    pub verify_otp: String,
    pub forgot_password: String,
    pub reset_password: String,
    pub update_password: String,
    pub refresh: String,
}

impl Default for AuthPaths {
    fn default() -> Self {
        Self {
            sign_up: "/auth/signup".to_string(),
            sign_in: "/auth/signin".to_string(),
            sign_out: "/auth/signout".to_string(),
            user: "/auth/user".to_string(),
            resend_otp: "/auth/otp/resend".to_string(),
            verify_otp: "/auth/otp/verify".to_string(),
            forgot_password: "/auth/password/forgot".to_string(),
            reset_password: "/auth/password/reset".to_string(),
            update_password: "/auth/password/update".to_string(),
            refresh: "/auth/token/refresh".to_string(),
        }
    }
}

/// Settings for a [`crate::session::SessionManager`].
///
/// # Example
/// ```
/// use restauth::config::AuthConfig;
/// use restauth::http::KeyConvention;
///
/// let config = AuthConfig::from_toml_str(r#"
///     base_url = "https://api.example.com"
///     key_convention = "camel_case"
///
///     [paths]
///     sign_in = "/v2/login"
/// "#)?;
/// assert_eq!(config.paths.sign_in, "/v2/login");
/// assert_eq!(config.paths.sign_up, "/auth/signup");
/// assert_eq!(config.key_convention, KeyConvention::CamelCase);
/// # Ok::<(), restauth::error::AuthError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub base_url: String,
    #[serde(default)]
    pub paths: AuthPaths,
    #[serde(default)]
    pub key_convention: KeyConvention,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Extra headers sent with every request (e.g. an API key).
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

impl AuthConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            paths: AuthPaths::default(),
            key_convention: KeyConvention::default(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            storage_key: default_storage_key(),
            headers: BTreeMap::new(),
        }
    }

    pub fn with_paths(mut self, paths: AuthPaths) -> Self {
        self.paths = paths;
        self
    }

    pub fn with_key_convention(mut self, convention: KeyConvention) -> Self {
        self.key_convention = convention;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Per-request timeout; never below one second, whatever was loaded.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Load from environment variables (`RESTAUTH_BASE_URL`, `RESTAUTH_TIMEOUT_SECS`,
    /// `RESTAUTH_STORAGE_KEY`, `RESTAUTH_KEY_CONVENTION`), reading `.env` first.
    pub fn from_env() -> Result<Self, AuthError> {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let base_url = std::env::var("RESTAUTH_BASE_URL")
            .map_err(|_| AuthError::custom("RESTAUTH_BASE_URL is not set"))?;
        let mut config = Self::new(base_url);

        if let Ok(raw) = std::env::var("RESTAUTH_TIMEOUT_SECS") {
            config.timeout_secs = raw.trim().parse().map_err(|_| {
                AuthError::custom(format!("RESTAUTH_TIMEOUT_SECS is not a number: {raw}"))
            })?;
        }
        if let Ok(key) = std::env::var("RESTAUTH_STORAGE_KEY") {
            config.storage_key = key;
        }
        if let Ok(raw) = std::env::var("RESTAUTH_KEY_CONVENTION") {
            config.key_convention = raw.trim().parse().map_err(|_| {
                AuthError::custom(format!("unknown RESTAUTH_KEY_CONVENTION: {raw}"))
            })?;
        }
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, AuthError> {
        toml::from_str(raw).map_err(|err| AuthError::custom(format!("invalid configuration: {err}")))
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, AuthError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|err| {
            AuthError::custom(format!("failed to read {}: {err}", path.display()))
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn new_uses_documented_defaults() {
        let config = AuthConfig::new("https://api.example.com");
        assert_eq!(config.paths.refresh, "/auth/token/refresh");
        assert_eq!(config.paths.update_password, "/auth/password/update");
        assert_eq!(config.key_convention, KeyConvention::SnakeCase);
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.storage_key, "restauth.session");
    }

    #[test]
    fn toml_without_base_url_is_rejected() {
        let err = AuthConfig::from_toml_str("timeout_secs = 5").unwrap_err();
        assert!(matches!(err, AuthError::Custom(msg) if msg.contains("base_url")));
    }

    #[test]
    fn toml_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.toml");
        let config = AuthConfig::new("https://api.example.com")
            .with_storage_key("app.session")
            .with_header("x-api-key", "k");
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();
        assert_eq!(AuthConfig::load_from_path(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let err = AuthConfig::load_from_path(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, AuthError::Custom(_)));
    }

    #[test]
    fn with_timeout_never_drops_to_zero() {
        let config = AuthConfig::new("x").with_timeout(Duration::from_millis(200));
        assert_eq!(config.timeout_secs, 1);
    }

    #[test]
    fn zero_timeout_from_toml_is_clamped() {
        let config =
            AuthConfig::from_toml_str("base_url = \"https://api.example.com\"\ntimeout_secs = 0")
                .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(1));
    }
}
