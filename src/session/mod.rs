//! Session engine: state, persistence and change notifications.

mod listener;
pub mod manager;
mod persisted;

pub use listener::AuthStateCallback;
pub use manager::SessionManager;
