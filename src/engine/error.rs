//! Engine Error Types
//!
//! Closed normalization of everything the native engine can report.

use thiserror::Error;

/// Errors surfaced by the native engine adapter.
///
/// The engine only distinguishes zero from non-zero, so raw codes are logged
/// at the adapter boundary and never carried past it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine initialization failed")]
    InitFailed,

    #[error("Engine rejected start")]
    StartRejected,

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Engine not initialized")]
    NotInitialized,
}

/// Result type alias for adapter operations
pub type EngineResult<T> = Result<T, EngineError>;
