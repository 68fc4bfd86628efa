//! POSIX shared memory region
//!
//! Holds the termination flag. The coordinator creates and sizes the object;
//! workers map the existing one.

use std::fs::File;
use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU32, Ordering};
use tracing::debug;

use super::semaphore::c_name;
use crate::error::{FanoutError, Result};

const REGION_SIZE: usize = std::mem::size_of::<AtomicU32>();

const FLAG_CLEAR: u32 = 0;
const FLAG_RAISED: u32 = 1;

/// A mapped shared memory object sized for one `AtomicU32`
struct SharedRegion {
    name: String,
    _file: File,
    ptr: NonNull<AtomicU32>,
}

unsafe impl Send for SharedRegion {}
unsafe impl Sync for SharedRegion {}

impl SharedRegion {
    fn create(name: &str) -> Result<Self> {
        let c_name = c_name(name)?;
        unsafe {
            libc::shm_unlink(c_name.as_ptr());
        }

        let fd = unsafe {
            libc::shm_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL | libc::O_RDWR,
                0o600 as libc::mode_t,
            )
        };
        if fd < 0 {
            return Err(create_error(name, io::Error::last_os_error()));
        }
        let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
        file.set_len(REGION_SIZE as u64)
            .map_err(|e| create_error(name, e))?;

        let region = Self::map(name, file).map_err(|e| create_error(name, e))?;
        debug!("Created shared memory {} ({} bytes)", name, REGION_SIZE);
        Ok(region)
    }

    fn open(name: &str) -> Result<Self> {
        let c_name = c_name(name)?;
        let fd = unsafe { libc::shm_open(c_name.as_ptr(), libc::O_RDWR, 0) };
        if fd < 0 {
            return Err(open_error(name, io::Error::last_os_error()));
        }
        let file = File::from(unsafe { OwnedFd::from_raw_fd(fd) });
        Self::map(name, file).map_err(|e| open_error(name, e))
    }

    fn map(name: &str, file: File) -> io::Result<Self> {
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                REGION_SIZE,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(addr.cast::<AtomicU32>())
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "mmap returned null"))?;

        Ok(Self {
            name: name.to_string(),
            _file: file,
            ptr,
        })
    }

    fn cell(&self) -> &AtomicU32 {
        // Page-aligned mapping of at least REGION_SIZE bytes, alive until drop.
        unsafe { self.ptr.as_ref() }
    }

    fn unlink(&self) -> Result<()> {
        let c_name = c_name(&self.name)?;
        if unsafe { libc::shm_unlink(c_name.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(FanoutError::ResourceRelease {
                resource: format!("shared memory {}", self.name),
                source: io::Error::last_os_error(),
            })
        }
    }
}

impl Drop for SharedRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), REGION_SIZE);
        }
    }
}

fn create_error(name: &str, source: io::Error) -> FanoutError {
    FanoutError::ResourceCreate {
        resource: format!("shared memory {}", name),
        source,
    }
}

fn open_error(name: &str, source: io::Error) -> FanoutError {
    FanoutError::ResourceOpen {
        resource: format!("shared memory {}", name),
        source,
    }
}

/// Cross-process stop flag, written once by the coordinator and polled by
/// workers between rounds
pub struct TerminationFlag {
    region: SharedRegion,
}

impl TerminationFlag {
    /// Create the flag in the cleared state
    pub fn create(name: &str) -> Result<Self> {
        let region = SharedRegion::create(name)?;
        region.cell().store(FLAG_CLEAR, Ordering::Release);
        Ok(Self { region })
    }

    /// Map the flag created by the coordinator
    pub fn open(name: &str) -> Result<Self> {
        Ok(Self {
            region: SharedRegion::open(name)?,
        })
    }

    /// Set the flag. There is no way to clear it again.
    pub fn raise(&self) {
        self.region.cell().store(FLAG_RAISED, Ordering::Release);
    }

    /// Non-blocking read
    pub fn is_raised(&self) -> bool {
        self.region.cell().load(Ordering::Acquire) == FLAG_RAISED
    }

    /// Remove the shared memory name
    pub fn unlink(&self) -> Result<()> {
        self.region.unlink()
    }
}

impl std::fmt::Debug for TerminationFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminationFlag")
            .field("name", &self.region.name)
            .field("raised", &self.is_raised())
            .finish()
    }
}
