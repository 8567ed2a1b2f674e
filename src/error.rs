use std::io;
use thiserror::Error;

/// Error type for everything that can go wrong outside of programmer error.
///
/// Internal shape contracts between the forward cache and the gradient engine
/// are enforced with assertions instead: a mismatch there is a bug in this
/// crate, not a condition a caller can recover from.
#[derive(Error, Debug)]
pub enum PuckError {
    /// Invalid configuration (non-positive sizes, corpus too short, ...)
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A symbol fell outside the configured vocabulary
    #[error("symbol {symbol} outside vocabulary of size {vocab_size}")]
    Encoding { symbol: u8, vocab_size: usize },

    /// A caller-supplied argument was out of range
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// A checkpoint's tensors do not match the configuration stored with them
    #[error("checkpoint shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// IO errors during checkpoint save/load
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON errors from the config blob inside a checkpoint
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, PuckError>;
