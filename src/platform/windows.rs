//! Windows shared-memory region reader.
//!
//! HWiNFO publishes sensor data in a named file mapping guarded by a named
//! global mutex shared with every consumer. The mutex must be held for the
//! minimum duration needed to copy the bytes out, so this reader copies the
//! full region into a reusable scratch buffer and releases everything before
//! decoding happens elsewhere.

use std::io;

use windows_sys::Win32::Foundation::{
    CloseHandle, GetLastError, ERROR_FILE_NOT_FOUND, HANDLE, WAIT_ABANDONED, WAIT_OBJECT_0,
    WAIT_TIMEOUT,
};
use windows_sys::Win32::System::Memory::{
    MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, FILE_MAP_READ, MEMORY_MAPPED_VIEW_ADDRESS,
};
use windows_sys::Win32::System::Threading::{OpenMutexW, ReleaseMutex, WaitForSingleObject};

use super::RegionSource;
use crate::core::shmem::layout::{Header, HEADER_LEN};
use crate::error::{BridgeError, Result};

/// Name of the file mapping object published by HWiNFO.
pub const MAP_NAME: &str = "Global\\HWiNFO_SENS_SM2";
/// Name of the global mutex guarding the shared memory space.
pub const MUTEX_NAME: &str = "Global\\HWiNFO_SM2_MUTEX";

const SYNCHRONIZE: u32 = 0x0010_0000;

/// Bound on the mutex wait so a wedged producer cannot hang a poll forever.
const MUTEX_WAIT_MS: u32 = 5_000;

fn wide(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(std::iter::once(0)).collect()
}

/// Map the thread's last OS error onto the bridge taxonomy. A missing named
/// object means HWiNFO is not running (or shared memory support is off).
fn last_error(what: &str) -> BridgeError {
    let code = unsafe { GetLastError() };
    if code == ERROR_FILE_NOT_FOUND {
        BridgeError::unavailable(format!(
            "{what}: HWiNFO is not running or shared memory support is disabled"
        ))
    } else {
        BridgeError::Io(io::Error::from_raw_os_error(code as i32))
    }
}

/// Acquired named mutex, released and closed on drop.
struct NamedMutexGuard {
    handle: HANDLE,
}

impl NamedMutexGuard {
    fn acquire(name: &str) -> Result<Self> {
        let wide_name = wide(name);
        let handle = unsafe { OpenMutexW(SYNCHRONIZE, 0, wide_name.as_ptr()) };
        if handle.is_null() {
            return Err(last_error("OpenMutex"));
        }
        let wait = unsafe { WaitForSingleObject(handle, MUTEX_WAIT_MS) };
        match wait {
            // An abandoned mutex still grants ownership; the region itself is
            // validated after copying.
            WAIT_OBJECT_0 | WAIT_ABANDONED => Ok(NamedMutexGuard { handle }),
            WAIT_TIMEOUT => {
                unsafe { CloseHandle(handle) };
                Err(BridgeError::unavailable(
                    "timed out waiting for the shared memory mutex",
                ))
            }
            _ => {
                let err = last_error("WaitForSingleObject");
                unsafe { CloseHandle(handle) };
                Err(err)
            }
        }
    }
}

impl Drop for NamedMutexGuard {
    fn drop(&mut self) {
        unsafe {
            ReleaseMutex(self.handle);
            CloseHandle(self.handle);
        }
    }
}

/// Open file mapping handle, closed on drop.
struct Mapping {
    handle: HANDLE,
}

impl Mapping {
    fn open(name: &str) -> Result<Self> {
        let wide_name = wide(name);
        let handle = unsafe { OpenFileMappingW(FILE_MAP_READ, 0, wide_name.as_ptr()) };
        if handle.is_null() {
            return Err(last_error("OpenFileMapping"));
        }
        Ok(Mapping { handle })
    }
}

impl Drop for Mapping {
    fn drop(&mut self) {
        unsafe { CloseHandle(self.handle) };
    }
}

/// Mapped view of the region, unmapped on drop.
struct View {
    addr: MEMORY_MAPPED_VIEW_ADDRESS,
}

impl View {
    fn map(mapping: &Mapping) -> Result<Self> {
        let addr = unsafe { MapViewOfFile(mapping.handle, FILE_MAP_READ, 0, 0, 0) };
        if addr.Value.is_null() {
            return Err(last_error("MapViewOfFile"));
        }
        Ok(View { addr })
    }

    fn ptr(&self) -> *const u8 {
        self.addr.Value as *const u8
    }
}

impl Drop for View {
    fn drop(&mut self) {
        unsafe { UnmapViewOfFile(self.addr) };
    }
}

/// Region source backed by the live HWiNFO shared memory objects.
///
/// The scratch buffer is grown as needed and reused across polls to bound
/// allocation churn; callers always receive an independent copy of it.
pub struct SharedMemorySource {
    map_name: String,
    mutex_name: String,
    scratch: Vec<u8>,
}

impl SharedMemorySource {
    pub fn new() -> Self {
        Self::with_names(MAP_NAME, MUTEX_NAME)
    }

    pub fn with_names(map_name: &str, mutex_name: &str) -> Self {
        SharedMemorySource {
            map_name: map_name.to_string(),
            mutex_name: mutex_name.to_string(),
            scratch: Vec::new(),
        }
    }
}

impl Default for SharedMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionSource for SharedMemorySource {
    fn read_region(&mut self) -> Result<Vec<u8>> {
        let _mutex = NamedMutexGuard::acquire(&self.mutex_name)?;
        let mapping = Mapping::open(&self.map_name)?;
        let view = View::map(&mapping)?;

        // Read the fixed header first to learn the declared region length.
        let mut header_bytes = [0u8; HEADER_LEN];
        unsafe {
            std::ptr::copy_nonoverlapping(view.ptr(), header_bytes.as_mut_ptr(), HEADER_LEN);
        }
        let header = Header::parse(&header_bytes)?;
        let total = header.total_len();
        if total < HEADER_LEN {
            return Err(BridgeError::integrity(format!(
                "declared region length {total} below header size"
            )));
        }

        if self.scratch.len() < total {
            self.scratch.resize(total, 0);
        }
        unsafe {
            std::ptr::copy_nonoverlapping(view.ptr(), self.scratch.as_mut_ptr(), total);
        }

        // Guards drop here: unmap, close mapping, release mutex.
        Ok(self.scratch[..total].to_vec())
    }

    fn describe(&self) -> String {
        format!("shared memory source ({})", self.map_name)
    }
}
