// HWiNFO Bridge Library - Public API

// Re-export error types
pub mod error;
pub use error::{BridgeError, Result};

// Module declarations
pub mod config;
pub mod core;
pub mod ipc;
pub mod platform;

// Re-export commonly used types
pub use crate::config::BridgeConfig;
pub use crate::core::service::HardwareService;

/// Initialize logging for the host binary.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}

/// Initialize logging for the worker binary.
///
/// The worker reserves stdout for the one-line listener announcement, so
/// everything else must go to stderr.
pub fn init_worker_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();
}
