//! Settings Collaborator
//!
//! Synchronous key/value access to the host application's settings. The
//! manager never reads settings itself; callers pass a store explicitly.

use log::debug;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::engine::ProxyConfig;

/// Setting keys shared with the desktop shell
pub mod keys {
    pub const DEVICE_ADDRESS: &str = "deviceAddress";
    pub const ENABLE_VENDOR_COMMAND: &str = "enableVendorCommand";
    pub const IS_PROXY_RUNNING: &str = "isProxyRunning";
}

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Setting not found: {0}")]
    Missing(String),

    #[error("Setting {key} has the wrong type: {reason}")]
    TypeMismatch { key: String, reason: String },
}

/// Result type alias for settings access
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Untyped settings storage
pub trait SettingsStore: Send + Sync {
    fn get_value(&self, key: &str) -> Option<Value>;

    fn set_value(&self, key: &str, value: Value);
}

/// Typed accessors over any [`SettingsStore`]
pub trait SettingsExt: SettingsStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> SettingsResult<T> {
        let value = self
            .get_value(key)
            .ok_or_else(|| SettingsError::Missing(key.to_string()))?;
        serde_json::from_value(value).map_err(|e| SettingsError::TypeMismatch {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    fn set<T: Serialize>(&self, key: &str, value: T) -> SettingsResult<()> {
        let value = serde_json::to_value(value).map_err(|e| SettingsError::TypeMismatch {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        self.set_value(key, value);
        Ok(())
    }
}

impl<S: SettingsStore + ?Sized> SettingsExt for S {}

/// What a start needs from settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub device_address: String,
    pub config: ProxyConfig,
}

impl SessionSettings {
    /// Read the device address (required) and vendor-command flag (default off)
    pub fn load<S: SettingsStore + ?Sized>(store: &S) -> SettingsResult<Self> {
        let device_address: String = store.get(keys::DEVICE_ADDRESS)?;
        let enable_vendor_command = match store.get::<bool>(keys::ENABLE_VENDOR_COMMAND) {
            Ok(flag) => flag,
            Err(SettingsError::Missing(_)) => false,
            Err(e) => return Err(e),
        };

        Ok(Self {
            device_address,
            config: ProxyConfig {
                enable_vendor_command,
            },
        })
    }
}

/// In-memory store for hosts without their own settings backend
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: RwLock<HashMap<String, Value>>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style initial value
    pub fn with_value(self, key: &str, value: impl Into<Value>) -> Self {
        self.values.write().insert(key.to_string(), value.into());
        self
    }
}

impl SettingsStore for MemorySettings {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) {
        debug!("Setting {} = {}", key, value);
        self.values.write().insert(key.to_string(), value);
    }
}
