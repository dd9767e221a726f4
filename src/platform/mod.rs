// Platform-specific code module

pub mod file;
pub mod process_group;
#[cfg(windows)]
pub mod windows;

pub use file::FileRegionSource;
pub use process_group::ProcessGroup;
#[cfg(windows)]
pub use windows::SharedMemorySource;

use crate::error::Result;

/// A source of raw shared-memory region bytes.
///
/// Implementations must return a freshly owned copy on every call; any
/// internal scratch buffer stays an implementation detail so a previously
/// returned region is never overwritten behind a holder's back.
pub trait RegionSource: Send {
    fn read_region(&mut self) -> Result<Vec<u8>>;

    /// Human-readable description for logs.
    fn describe(&self) -> String;
}
