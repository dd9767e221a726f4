//! Binds the worker subprocess to the host's lifetime.
//!
//! On Windows the child is assigned to a Job object configured with
//! kill-on-close, so closing the job handle (explicitly or when the host
//! dies) terminates the whole worker tree. On Unix the child is spawned into
//! its own process group and the group is killed on dispose.

use crate::error::Result;

/// OS process group / Job object wrapper. Disposing kills every process
/// bound into it; drop disposes as a fallback for unclean exits.
pub struct ProcessGroup {
    #[cfg(windows)]
    job: isize,
    #[cfg(unix)]
    pgid: Option<i32>,
    disposed: bool,
}

#[cfg(windows)]
impl ProcessGroup {
    pub fn new() -> Result<Self> {
        use windows_sys::Win32::System::JobObjects::{
            CreateJobObjectW, JobObjectExtendedLimitInformation, SetInformationJobObject,
            JOBOBJECT_EXTENDED_LIMIT_INFORMATION, JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE,
        };

        let job = unsafe { CreateJobObjectW(std::ptr::null(), std::ptr::null()) };
        if job.is_null() {
            return Err(std::io::Error::last_os_error().into());
        }

        let mut info: JOBOBJECT_EXTENDED_LIMIT_INFORMATION = unsafe { std::mem::zeroed() };
        info.BasicLimitInformation.LimitFlags = JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE;
        let ok = unsafe {
            SetInformationJobObject(
                job,
                JobObjectExtendedLimitInformation,
                &info as *const _ as *const std::ffi::c_void,
                std::mem::size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
            )
        };
        if ok == 0 {
            let err = std::io::Error::last_os_error();
            unsafe { windows_sys::Win32::Foundation::CloseHandle(job) };
            return Err(err.into());
        }

        Ok(ProcessGroup {
            job: job as isize,
            disposed: false,
        })
    }

    /// Bind a spawned process into the group by pid.
    pub fn add(&mut self, pid: u32) -> Result<()> {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::JobObjects::AssignProcessToJobObject;
        use windows_sys::Win32::System::Threading::{
            OpenProcess, PROCESS_SET_QUOTA, PROCESS_TERMINATE,
        };

        let process = unsafe { OpenProcess(PROCESS_SET_QUOTA | PROCESS_TERMINATE, 0, pid) };
        if process.is_null() {
            return Err(std::io::Error::last_os_error().into());
        }
        let ok = unsafe { AssignProcessToJobObject(self.job as _, process) };
        let err = std::io::Error::last_os_error();
        unsafe { CloseHandle(process) };
        if ok == 0 {
            return Err(err.into());
        }
        Ok(())
    }

    /// Kill everything in the group and release the job handle.
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            unsafe { windows_sys::Win32::Foundation::CloseHandle(self.job as _) };
        }
    }
}

#[cfg(unix)]
impl ProcessGroup {
    pub fn new() -> Result<Self> {
        Ok(ProcessGroup {
            pgid: None,
            disposed: false,
        })
    }

    /// Record the process group of a child spawned with `process_group(0)`,
    /// where the group id equals the child's pid.
    pub fn add(&mut self, pid: u32) -> Result<()> {
        self.pgid = Some(pid as i32);
        Ok(())
    }

    /// Kill everything in the recorded process group.
    pub fn dispose(&mut self) {
        if !self.disposed {
            self.disposed = true;
            if let Some(pgid) = self.pgid {
                unsafe { libc::killpg(pgid, libc::SIGKILL) };
            }
        }
    }
}

// The job handle has process-global scope and no thread affinity.
#[cfg(windows)]
unsafe impl Send for ProcessGroup {}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.dispose();
    }
}
