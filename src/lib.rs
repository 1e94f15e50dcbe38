//! restauth: client-side session SDK for REST authentication backends.
//!
//! Wraps a JSON/HTTP auth API (sign-up, sign-in, OTP, password flows,
//! refresh) behind a [`SessionManager`](session::SessionManager) that
//! persists the session in a pluggable secret store, attaches the bearer
//! token to application calls, and publishes state transitions to a single
//! listener.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use restauth::prelude::*;
//!
//! # async fn example() -> restauth::error::Result<()> {
//! let config = AuthConfig::from_env()?;
//! let manager = SessionManager::new(config, Arc::new(FileSecretStore::new_default()));
//! manager.restored().await;
//!
//! if manager.current_session().is_none() {
//!     manager.sign_in("ada@example.com", "hunter2", IdentifierKind::Email).await?;
//! }
//! let profile: AnyJson = manager.get("/me/profile", RequestOptions::new()).await?;
//! println!("{profile:?}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod prelude;
pub mod session;
pub mod store;
pub mod types;
pub mod util;
pub mod value;
