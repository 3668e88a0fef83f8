//! Disconnect Trampoline
//!
//! The engine's callback carries no user-data pointer, so the function handed
//! to it is a single `extern "C"` item with a fixed address. It finds its
//! captured state through a process-wide slot holding a *weak* reference;
//! the strong reference lives in the adapter's registration table, which is
//! the only thing keeping a relay alive.

use log::{debug, error};
use parking_lot::RwLock;
use std::ffi::CStr;
use std::os::raw::c_char;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};

/// Identifier of one start-to-stop session
pub type SessionId = u64;

/// Disconnect report marshaled off the native thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeNotice {
    /// Session the report was registered for
    pub session_id: SessionId,
    /// Diagnostic message supplied by the engine
    pub reason: String,
}

/// Captured state behind the trampoline.
///
/// The sink must only enqueue; it runs on whatever thread the engine uses.
pub struct DisconnectRelay {
    session_id: SessionId,
    sink: Box<dyn Fn(NativeNotice) + Send + Sync>,
}

impl DisconnectRelay {
    /// Create a relay for a session
    pub fn new(session_id: SessionId, sink: impl Fn(NativeNotice) + Send + Sync + 'static) -> Self {
        Self {
            session_id,
            sink: Box::new(sink),
        }
    }

    /// Session this relay reports for
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    fn forward(&self, reason: String) {
        (self.sink)(NativeNotice {
            session_id: self.session_id,
            reason,
        });
    }
}

impl std::fmt::Debug for DisconnectRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisconnectRelay")
            .field("session_id", &self.session_id)
            .finish_non_exhaustive()
    }
}

static ACTIVE_RELAY: RwLock<Option<Weak<DisconnectRelay>>> = parking_lot::const_rwlock(None);

/// Point the trampoline at `relay`
pub(crate) fn install(relay: &Arc<DisconnectRelay>) {
    *ACTIVE_RELAY.write() = Some(Arc::downgrade(relay));
}

/// Detach the trampoline from `session_id`, leaving a newer relay untouched
pub(crate) fn uninstall(session_id: SessionId) {
    let mut slot = ACTIVE_RELAY.write();
    let owned_by_session = slot
        .as_ref()
        .and_then(Weak::upgrade)
        .map_or(true, |relay| relay.session_id == session_id);
    if owned_by_session {
        *slot = None;
    }
}

/// The function registered with the engine.
///
/// # Safety
/// `message` must be null or point to a NUL-terminated string valid for the
/// duration of the call.
pub(crate) unsafe extern "C" fn disconnect_trampoline(message: *const c_char) {
    let reason = if message.is_null() {
        String::new()
    } else {
        CStr::from_ptr(message).to_string_lossy().into_owned()
    };

    // Unwinding into the engine's C++ frames is undefined.
    if std::panic::catch_unwind(AssertUnwindSafe(|| dispatch(reason))).is_err() {
        error!("Disconnect relay panicked on the native thread");
    }
}

fn dispatch(reason: String) {
    let relay = ACTIVE_RELAY.read().as_ref().and_then(Weak::upgrade);
    match relay {
        Some(relay) => {
            debug!("Native disconnect for session {}: {}", relay.session_id, reason);
            relay.forward(reason);
        }
        None => debug!("Native disconnect with no registered relay: {}", reason),
    }
}
