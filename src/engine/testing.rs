//! Scriptable stand-in for the native engine.

use parking_lot::Mutex;
use std::ffi::{CStr, CString};
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::ffi::{DisconnectCallback, NativeEngine, RawProxyConfig};

/// A native call as the engine saw it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    Init,
    ChangeConfig(RawProxyConfig),
    StartWithAddress(String),
    Stop,
    SetOnDisconnectCallback,
}

#[derive(Default)]
struct FakeState {
    calls: Mutex<Vec<NativeCall>>,
    init_code: AtomicI32,
    start_code: AtomicI32,
    start_delay: Mutex<Option<Duration>>,
    stop_disconnect: Mutex<Option<String>>,
    callback: Mutex<Option<DisconnectCallback>>,
}

/// Records every call; clones share state so tests can inspect after handing
/// one clone to an adapter.
#[derive(Clone, Default)]
pub struct FakeEngine {
    state: Arc<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `init` return `code`
    pub fn fail_init(&self, code: i32) {
        self.state.init_code.store(code, Ordering::SeqCst);
    }

    /// Make `start_with_address` return `code`
    pub fn reject_start(&self, code: i32) {
        self.state.start_code.store(code, Ordering::SeqCst);
    }

    /// Make `start_with_address` block for `delay`
    pub fn delay_start(&self, delay: Duration) {
        *self.state.start_delay.lock() = Some(delay);
    }

    /// Make `stop` report a disconnect with `reason` before it returns, as
    /// the library's socket thread does when its client is killed
    pub fn disconnect_on_stop(&self, reason: &str) {
        *self.state.stop_disconnect.lock() = Some(reason.to_string());
    }

    pub fn calls(&self) -> Vec<NativeCall> {
        self.state.calls.lock().clone()
    }

    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.state.calls.lock().iter().filter(|c| predicate(c)).count()
    }

    pub fn configs(&self) -> Vec<RawProxyConfig> {
        self.state
            .calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                NativeCall::ChangeConfig(raw) => Some(*raw),
                _ => None,
            })
            .collect()
    }

    /// Invoke the registered callback from a foreign thread, as the engine's
    /// socket thread would. Returns false if nothing was ever registered.
    pub fn fire_disconnect(&self, reason: &str) -> bool {
        let Some(callback) = *self.state.callback.lock() else {
            return false;
        };
        let message = CString::new(reason).unwrap();
        std::thread::spawn(move || unsafe { callback(message.as_ptr()) })
            .join()
            .unwrap();
        true
    }

    fn record(&self, call: NativeCall) {
        self.state.calls.lock().push(call);
    }
}

impl NativeEngine for FakeEngine {
    fn init(&self) -> i32 {
        self.record(NativeCall::Init);
        self.state.init_code.load(Ordering::SeqCst)
    }

    fn start_with_address(&self, address: &CStr) -> i32 {
        self.record(NativeCall::StartWithAddress(
            address.to_string_lossy().into_owned(),
        ));
        let delay = *self.state.start_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.state.start_code.load(Ordering::SeqCst)
    }

    fn stop(&self) {
        self.record(NativeCall::Stop);
        let reason = self.state.stop_disconnect.lock().clone();
        if let Some(reason) = reason {
            self.fire_disconnect(&reason);
        }
    }

    fn set_on_disconnect_callback(&self, callback: DisconnectCallback) {
        self.record(NativeCall::SetOnDisconnectCallback);
        *self.state.callback.lock() = Some(callback);
    }

    fn change_config(&self, config: &mut RawProxyConfig) {
        self.record(NativeCall::ChangeConfig(*config));
    }
}
