//! Native Engine ABI
//!
//! The fixed C contract exported by the elaphureLink proxy library, plus the
//! `NativeEngine` seam the adapter drives. All entry points use the C calling
//! convention and the library documents none of them as thread safe.

use serde::{Deserialize, Serialize};
use std::ffi::CStr;
use std::os::raw::c_char;

/// Callback the engine invokes, on its own thread, when the device link drops.
/// The argument is a narrow, NUL-terminated diagnostic message (may be null).
pub type DisconnectCallback = unsafe extern "C" fn(message: *const c_char);

/// Mirror of `struct el_proxy_config`.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawProxyConfig {
    pub enable_vendor_command: u8,
}

/// Runtime-adjustable engine configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    /// Forward vendor-specific DAP commands to the device
    pub enable_vendor_command: bool,
}

impl From<ProxyConfig> for RawProxyConfig {
    fn from(config: ProxyConfig) -> Self {
        Self {
            enable_vendor_command: u8::from(config.enable_vendor_command),
        }
    }
}

/// Raw entry points of the proxy engine.
///
/// Implementors forward each call verbatim; interpretation of return codes
/// belongs to [`super::NativeEngineAdapter`]. A return of `0` means success.
pub trait NativeEngine: Send + Sync + 'static {
    fn init(&self) -> i32;

    fn start_with_address(&self, address: &CStr) -> i32;

    fn stop(&self);

    fn set_on_disconnect_callback(&self, callback: DisconnectCallback);

    fn change_config(&self, config: &mut RawProxyConfig);
}

#[cfg(feature = "native-engine")]
mod native {
    use super::{DisconnectCallback, RawProxyConfig};
    use std::os::raw::c_char;

    #[link(name = "elaphureLinkProxy")]
    extern "C" {
        pub fn el_proxy_init() -> i32;
        pub fn el_proxy_start_with_address(address: *const c_char) -> i32;
        pub fn el_proxy_stop();
        pub fn el_proxy_set_on_disconnect_callback(callback: DisconnectCallback);
        pub fn el_proxy_change_config(config: *mut RawProxyConfig);
    }
}

/// The linked elaphureLinkProxy library.
///
/// The library keeps a single process-wide proxy instance, so there is no
/// per-value state here.
#[cfg(feature = "native-engine")]
#[derive(Debug, Default)]
pub struct ElaphureLinkProxy;

#[cfg(feature = "native-engine")]
impl NativeEngine for ElaphureLinkProxy {
    fn init(&self) -> i32 {
        // SAFETY: no arguments; the library guards repeated initialization itself.
        unsafe { native::el_proxy_init() }
    }

    fn start_with_address(&self, address: &CStr) -> i32 {
        // SAFETY: `address` is NUL-terminated and outlives the call; the library
        // copies it into its own std::string before returning.
        unsafe { native::el_proxy_start_with_address(address.as_ptr()) }
    }

    fn stop(&self) {
        // SAFETY: no arguments; stopping an idle proxy is a no-op in the library.
        unsafe { native::el_proxy_stop() }
    }

    fn set_on_disconnect_callback(&self, callback: DisconnectCallback) {
        // SAFETY: `callback` is a plain `extern "C"` function with a 'static address.
        unsafe { native::el_proxy_set_on_disconnect_callback(callback) }
    }

    fn change_config(&self, config: &mut RawProxyConfig) {
        // SAFETY: `config` is a valid, exclusively borrowed #[repr(C)] struct.
        unsafe { native::el_proxy_change_config(config) }
    }
}
