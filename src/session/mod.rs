//! Session Management Module
//!
//! Lifecycle of the proxy engine:
//! - A single serialized worker owns every native call
//! - Native disconnects are merged into the same work queue
//! - Status is published on a bus with a cached running flag

pub mod bus;
pub mod events;
pub mod manager;
pub mod state;

pub use bus::{StatusEventBus, SubscriptionHandle};
pub use events::{StatusEvent, StatusEventKind};
pub use manager::{ManagerConfig, ProxySessionManager, SessionError, SessionResult};
pub use state::{SessionInfo, SessionPhase};

pub use crate::engine::ProxyConfig;
