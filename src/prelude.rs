//! Convenience re-exports for common use.

pub use crate::config::{AuthConfig, AuthPaths};
pub use crate::error::{AuthError, Result, ServerError};
pub use crate::http::{HttpMethod, KeyConvention, RequestOptions, Transport};
pub use crate::session::SessionManager;
pub use crate::store::{FileSecretStore, MemorySecretStore, SecretStore};
pub use crate::types::{
    AuthResponse, AuthState, AuthStateChange, IdentifierKind, OtpType, Session, User,
};
pub use crate::value::AnyJson;
