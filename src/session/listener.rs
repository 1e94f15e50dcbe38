use std::sync::Mutex;

use crate::types::AuthStateChange;

/// Callback invoked synchronously for every state change.
///
/// Callbacks run while the notification slot is locked and must not register
/// another listener from inside the call.
pub type AuthStateCallback = dyn Fn(AuthStateChange) + Send + Sync;

/// Holds at most one listener. Registration and emission share one lock, so
/// a newly registered listener never sees a transition older than the
/// snapshot it was primed with.
#[derive(Default)]
pub(crate) struct ListenerSlot {
    current: Mutex<Option<Box<AuthStateCallback>>>,
}

impl ListenerSlot {
    /// Replace the listener, delivering `snapshot()` to it first.
    pub(crate) fn replace(
        &self,
        listener: Box<AuthStateCallback>,
        snapshot: impl FnOnce() -> AuthStateChange,
    ) {
        let mut slot = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
        listener(snapshot());
        *slot = Some(listener);
    }

    pub(crate) fn emit(&self, change: AuthStateChange) {
        let slot = self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(listener) = slot.as_ref() {
            listener(change);
        }
    }

    pub(crate) fn clear(&self) {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}
