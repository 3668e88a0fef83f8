//! Status Events
//!
//! Immutable status notifications published by the session manager.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What happened
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StatusEventKind {
    /// Engine connected to the device
    Started,
    /// Session ended, or a start attempt failed
    Stopped,
    /// Configuration applied to a running engine
    ConfigChanged,
    /// Engine reported losing the device on its own
    DisconnectedUnexpectedly { reason: String },
}

/// A status change, stamped at creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: StatusEventKind,
    pub timestamp: DateTime<Utc>,
}

impl StatusEvent {
    /// Create an event stamped now
    pub fn new(kind: StatusEventKind) -> Self {
        Self {
            kind,
            timestamp: Utc::now(),
        }
    }

    pub fn started() -> Self {
        Self::new(StatusEventKind::Started)
    }

    pub fn stopped() -> Self {
        Self::new(StatusEventKind::Stopped)
    }

    pub fn config_changed() -> Self {
        Self::new(StatusEventKind::ConfigChanged)
    }

    pub fn disconnected(reason: impl Into<String>) -> Self {
        Self::new(StatusEventKind::DisconnectedUnexpectedly {
            reason: reason.into(),
        })
    }

    /// Running flag this event implies, if it implies one
    pub fn running_status(&self) -> Option<bool> {
        match self.kind {
            StatusEventKind::Started => Some(true),
            StatusEventKind::Stopped | StatusEventKind::DisconnectedUnexpectedly { .. } => {
                Some(false)
            }
            StatusEventKind::ConfigChanged => None,
        }
    }

    /// Event name for UI listeners
    pub fn event_name(&self) -> &'static str {
        match self.kind {
            StatusEventKind::Started => "proxy-started",
            StatusEventKind::Stopped => "proxy-stopped",
            StatusEventKind::ConfigChanged => "proxy-config-changed",
            StatusEventKind::DisconnectedUnexpectedly { .. } => "proxy-disconnected",
        }
    }
}
