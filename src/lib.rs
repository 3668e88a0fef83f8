// elaphureLink proxy session core
//
// Owns the lifecycle of the native debugger proxy engine: serialized native
// calls, the disconnect trampoline, and status fan-out to the desktop shell.

// Declare modules
pub mod commands;
pub mod engine;
pub mod session;
pub mod settings;

pub use engine::{EngineError, NativeEngine, NativeEngineAdapter, ProxyConfig};
pub use session::{
    ProxySessionManager, SessionError, SessionInfo, SessionPhase, StatusEvent, StatusEventBus,
    StatusEventKind,
};
pub use settings::{MemorySettings, SettingsStore};
