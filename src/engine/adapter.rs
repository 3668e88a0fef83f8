//! Native Engine Adapter
//!
//! Typed wrapper over [`NativeEngine`]. Every native call happens while the
//! adapter's handle lock is held, so calls never interleave even if a caller
//! forgets to go through the session worker.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::ffi::CString;
use std::sync::Arc;

use super::error::{EngineError, EngineResult};
use super::ffi::{NativeEngine, ProxyConfig, RawProxyConfig};
use super::trampoline::{self, disconnect_trampoline, DisconnectRelay, SessionId};

/// Proof that the engine was initialized for a session.
///
/// Only exists between a successful `init` and the matching `stop`/`release`.
#[derive(Debug)]
struct EngineHandle {
    session_id: SessionId,
    initialized_at: DateTime<Utc>,
}

/// Adapter around the native proxy engine
pub struct NativeEngineAdapter<E: NativeEngine> {
    engine: E,
    /// Current engine handle; its lock doubles as the native call lock
    handle: Mutex<Option<EngineHandle>>,
    /// Retained relays (session_id -> relay). These strong references are what
    /// keep the trampoline's captured state alive while the engine may call it.
    registrations: DashMap<SessionId, Arc<DisconnectRelay>>,
}

impl<E: NativeEngine> NativeEngineAdapter<E> {
    /// Wrap an engine
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            handle: Mutex::new(None),
            registrations: DashMap::new(),
        }
    }

    /// Initialize the engine for `session_id`
    pub fn init(&self, session_id: SessionId) -> EngineResult<()> {
        let mut handle = self.handle.lock();

        let code = self.engine.init();
        if code != 0 {
            warn!("el_proxy_init failed with code {}", code);
            return Err(EngineError::InitFailed);
        }

        if let Some(stale) = handle.replace(EngineHandle {
            session_id,
            initialized_at: Utc::now(),
        }) {
            warn!(
                "Replacing engine handle of session {} initialized at {}",
                stale.session_id, stale.initialized_at
            );
            self.release_registration(stale.session_id);
        }

        debug!("Engine initialized for session {}", session_id);
        Ok(())
    }

    /// Push a configuration to the engine
    pub fn change_config(&self, config: ProxyConfig) -> EngineResult<()> {
        let handle = self.handle.lock();
        if handle.is_none() {
            return Err(EngineError::NotInitialized);
        }

        let mut raw = RawProxyConfig::from(config);
        self.engine.change_config(&mut raw);
        debug!("Engine config applied: {:?}", config);
        Ok(())
    }

    /// Connect the engine to a device address
    pub fn start_with_address(&self, address: &str) -> EngineResult<()> {
        let narrow = narrow_address(address)?;

        let handle = self.handle.lock();
        if handle.is_none() {
            return Err(EngineError::NotInitialized);
        }

        let code = self.engine.start_with_address(&narrow);
        if code != 0 {
            warn!("el_proxy_start_with_address({}) failed with code {}", address, code);
            return Err(EngineError::StartRejected);
        }

        info!("Engine started with address {}", address);
        Ok(())
    }

    /// Hand the engine our trampoline and retain `relay` until the session ends
    pub fn register_disconnect_callback(&self, relay: DisconnectRelay) -> EngineResult<()> {
        let handle = self.handle.lock();
        if handle.is_none() {
            return Err(EngineError::NotInitialized);
        }

        let session_id = relay.session_id();
        let relay = Arc::new(relay);
        self.registrations.insert(session_id, Arc::clone(&relay));
        trampoline::install(&relay);
        self.engine.set_on_disconnect_callback(disconnect_trampoline);

        debug!("Disconnect callback registered for session {}", session_id);
        Ok(())
    }

    /// Stop the engine, then release the handle and the callback registration
    pub fn stop(&self) {
        let mut handle = self.handle.lock();
        let Some(current) = handle.take() else {
            debug!("Engine stop requested with no live handle");
            return;
        };

        self.engine.stop();
        self.release_registration(current.session_id);
        info!("Engine stopped for session {}", current.session_id);
    }

    /// Drop the handle and registration of a session the engine already ended
    pub fn release(&self, session_id: SessionId) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| h.session_id == session_id) {
            handle.take();
        }
        self.release_registration(session_id);
        debug!("Engine resources released for session {}", session_id);
    }

    /// Whether a handle is currently held
    pub fn is_initialized(&self) -> bool {
        self.handle.lock().is_some()
    }

    /// Number of relays currently retained
    pub fn registration_count(&self) -> usize {
        self.registrations.len()
    }

    fn release_registration(&self, session_id: SessionId) {
        if self.registrations.remove(&session_id).is_some() {
            trampoline::uninstall(session_id);
        }
    }
}

/// Encode an address for `char*`. The engine reads it in the ANSI code page,
/// so only ASCII is accepted.
fn narrow_address(address: &str) -> EngineResult<CString> {
    if address.is_empty() || !address.is_ascii() {
        return Err(EngineError::InvalidAddress(address.to_string()));
    }
    CString::new(address).map_err(|_| EngineError::InvalidAddress(address.to_string()))
}
