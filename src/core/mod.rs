// Core functionality module

pub mod index;
pub mod poller;
pub mod service;
pub mod shmem;
pub mod supervisor;

pub use self::service::{HardwareService, ReadingInfo, SensorInfo};
pub use self::shmem::Snapshot;
