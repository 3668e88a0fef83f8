//! Native Engine Module
//!
//! Everything that touches the elaphureLink proxy library:
//! - The raw C ABI and the `NativeEngine` seam
//! - Return-code normalization and string marshaling
//! - The fixed-address disconnect trampoline and its keep-alive table

pub mod adapter;
pub mod error;
pub mod ffi;
pub mod trampoline;

#[cfg(test)]
pub(crate) mod testing;

pub use adapter::NativeEngineAdapter;
pub use error::{EngineError, EngineResult};
pub use ffi::{DisconnectCallback, NativeEngine, ProxyConfig, RawProxyConfig};
pub use trampoline::{DisconnectRelay, NativeNotice, SessionId};

#[cfg(feature = "native-engine")]
pub use ffi::ElaphureLinkProxy;
