//! Session State Management
//!
//! Tracks the single proxy session owned by the manager's worker.

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::engine::{ProxyConfig, SessionId};

/// Phase of the proxy session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionPhase {
    /// No engine activity
    Idle,
    /// Engine `init` in flight
    Initializing,
    /// Configuration being pushed to the engine
    Configuring,
    /// Engine connected to the device
    Running,
    /// Engine `stop` in flight
    Stopping,
    /// Last start attempt failed; a fresh start is allowed
    Faulted,
}

impl Default for SessionPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Initializing => write!(f, "initializing"),
            Self::Configuring => write!(f, "configuring"),
            Self::Running => write!(f, "running"),
            Self::Stopping => write!(f, "stopping"),
            Self::Faulted => write!(f, "faulted"),
        }
    }
}

impl SessionPhase {
    /// Whether the engine may be in use
    pub fn is_live(self) -> bool {
        matches!(
            self,
            Self::Initializing | Self::Configuring | Self::Running | Self::Stopping
        )
    }

    /// Whether a new start may begin
    pub fn accepts_start(self) -> bool {
        matches!(self, Self::Idle | Self::Faulted)
    }
}

/// The proxy session. Only the manager's worker holds one.
#[derive(Debug, Default)]
pub struct Session {
    /// Incremented on every start attempt
    pub id: SessionId,
    /// Current phase
    pub phase: SessionPhase,
    /// Device address, fixed while live
    pub device_address: Option<String>,
    /// Config applied at the next start, or already applied while running
    pub config: ProxyConfig,
    /// Diagnostic from the last failure
    pub last_error: Option<String>,
    /// When the current session reached Running
    pub started_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Create an idle session with a cached config
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Move to `phase`, logging the transition
    pub fn set_phase(&mut self, phase: SessionPhase) {
        debug!("Session {} phase {} -> {}", self.id, self.phase, phase);
        self.phase = phase;
    }

    /// Idle → Initializing for a new address; returns the new session id
    pub fn begin(&mut self, address: impl Into<String>) -> SessionId {
        self.id += 1;
        self.device_address = Some(address.into());
        self.started_at = None;
        self.set_phase(SessionPhase::Initializing);
        self.id
    }

    /// Mark the session as running
    pub fn set_running(&mut self) {
        self.last_error = None;
        self.started_at = Some(Utc::now());
        self.set_phase(SessionPhase::Running);
    }

    /// Mark the session as faulted with error
    pub fn set_faulted(&mut self, error: impl Into<String>) {
        self.last_error = Some(error.into());
        self.started_at = None;
        self.set_phase(SessionPhase::Faulted);
    }

    /// Return to Idle after a stop or disconnect
    pub fn reset(&mut self) {
        self.device_address = None;
        self.started_at = None;
        self.set_phase(SessionPhase::Idle);
    }
}

/// Serializable session snapshot for status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionInfo {
    pub id: SessionId,
    pub phase: SessionPhase,
    pub device_address: Option<String>,
    pub config: ProxyConfig,
    pub last_error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
}

impl From<&Session> for SessionInfo {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            phase: session.phase,
            device_address: session.device_address.clone(),
            config: session.config,
            last_error: session.last_error.clone(),
            started_at: session.started_at,
        }
    }
}
