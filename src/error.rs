use std::io;
use thiserror::Error;

/// Custom error type for the HWiNFO bridge
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The backing source (HWiNFO app or the worker process) is not reachable.
    /// Recoverable: the next poll tick or worker respawn may resolve it.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// Declared offsets/counts exceed buffer bounds, or a reading points at a
    /// sensor index that does not exist. Resolved only by the next good poll.
    #[error("shared memory integrity: {0}")]
    Integrity(String),

    /// Handshake cookie/version mismatch across the process boundary.
    /// Fatal for that connection attempt.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A query referenced a sensor key absent from the current snapshot.
    #[error("not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for the HWiNFO bridge
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Create an unavailable error
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        BridgeError::Unavailable(msg.into())
    }

    /// Create an integrity error
    pub fn integrity<S: Into<String>>(msg: S) -> Self {
        BridgeError::Integrity(msg.into())
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(msg: S) -> Self {
        BridgeError::Protocol(msg.into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        BridgeError::NotFound(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        BridgeError::Config(msg.into())
    }
}
