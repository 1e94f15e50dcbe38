//! Data model shared by the HTTP pipeline and the session manager.

pub mod auth;
pub mod requests;
pub mod session;
pub mod timestamp;
pub mod user;

pub use auth::{AuthResponse, AuthState, AuthStateChange};
pub use requests::{IdentifierKind, OtpType};
pub use session::Session;
pub use user::User;
