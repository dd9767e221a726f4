//! File-backed region source.
//!
//! Reads a raw dump of the shared memory region from a regular file. Used by
//! tests and for offline debugging of captured regions; also the only source
//! available off Windows.

use std::fs;
use std::io;
use std::path::PathBuf;

use super::RegionSource;
use crate::error::{BridgeError, Result};

pub struct FileRegionSource {
    path: PathBuf,
}

impl FileRegionSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileRegionSource { path: path.into() }
    }
}

impl RegionSource for FileRegionSource {
    fn read_region(&mut self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(BridgeError::unavailable(
                format!("region dump not found: {}", self.path.display()),
            )),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("file region source ({})", self.path.display())
    }
}
