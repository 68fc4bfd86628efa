//! POSIX named semaphores
//!
//! Thin owner of a `sem_t` opened by name, shared between the coordinator
//! and every worker process on the host.

use std::ffi::CString;
use std::io;
use tracing::debug;

use crate::error::{FanoutError, Result};

/// Handle to a named counting semaphore
pub struct NamedSemaphore {
    name: String,
    sem: *mut libc::sem_t,
}

// sem_wait/sem_post/sem_getvalue are thread-safe on a shared sem_t.
unsafe impl Send for NamedSemaphore {}
unsafe impl Sync for NamedSemaphore {}

impl NamedSemaphore {
    /// Create a fresh semaphore, replacing any stale one with the same name
    pub fn create(name: &str, initial: u32) -> Result<Self> {
        let c_name = c_name(name)?;

        unsafe {
            // Leftovers from a crashed run would make O_EXCL fail.
            libc::sem_unlink(c_name.as_ptr());
        }

        let sem = unsafe {
            libc::sem_open(
                c_name.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o600 as libc::c_uint,
                initial as libc::c_uint,
            )
        };
        if sem == libc::SEM_FAILED {
            return Err(FanoutError::ResourceCreate {
                resource: format!("semaphore {}", name),
                source: io::Error::last_os_error(),
            });
        }

        debug!("Created semaphore {} with value {}", name, initial);
        Ok(Self {
            name: name.to_string(),
            sem,
        })
    }

    /// Open a semaphore previously created by the coordinator
    pub fn open(name: &str) -> Result<Self> {
        let c_name = c_name(name)?;
        let sem = unsafe { libc::sem_open(c_name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(FanoutError::ResourceOpen {
                resource: format!("semaphore {}", name),
                source: io::Error::last_os_error(),
            });
        }
        Ok(Self {
            name: name.to_string(),
            sem,
        })
    }

    /// Semaphore name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decrement, blocking while the value is zero.
    ///
    /// Interruption by a signal restarts the wait.
    pub fn wait(&self) -> Result<()> {
        loop {
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(());
            }
            let err = io::Error::last_os_error();
            if err.kind() != io::ErrorKind::Interrupted {
                return Err(self.failure("sem_wait", err));
            }
        }
    }

    /// Increment, waking one blocked waiter
    pub fn post(&self) -> Result<()> {
        if unsafe { libc::sem_post(self.sem) } == 0 {
            Ok(())
        } else {
            Err(self.failure("sem_post", io::Error::last_os_error()))
        }
    }

    /// Current value (diagnostic only, may be stale immediately)
    pub fn value(&self) -> Result<i32> {
        let mut value: libc::c_int = 0;
        if unsafe { libc::sem_getvalue(self.sem, &mut value) } == 0 {
            Ok(value)
        } else {
            Err(self.failure("sem_getvalue", io::Error::last_os_error()))
        }
    }

    /// Remove the name so no further process can open it.
    ///
    /// Processes that already hold the semaphore keep using it.
    pub fn unlink(&self) -> Result<()> {
        let c_name = c_name(&self.name)?;
        if unsafe { libc::sem_unlink(c_name.as_ptr()) } == 0 {
            Ok(())
        } else {
            Err(FanoutError::ResourceRelease {
                resource: format!("semaphore {}", self.name),
                source: io::Error::last_os_error(),
            })
        }
    }

    fn failure(&self, op: &'static str, source: io::Error) -> FanoutError {
        FanoutError::Semaphore {
            op,
            name: self.name.clone(),
            source,
        }
    }
}

impl Drop for NamedSemaphore {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
        }
    }
}

impl std::fmt::Debug for NamedSemaphore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamedSemaphore").field("name", &self.name).finish()
    }
}

pub(crate) fn c_name(name: &str) -> Result<CString> {
    CString::new(name).map_err(|_| FanoutError::InvalidConfig {
        reason: format!("resource name {:?} contains a NUL byte", name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn unique(tag: &str) -> String {
        format!("/fanout-test-{}-{}", std::process::id(), tag)
    }

    #[test]
    fn test_post_then_wait() {
        let name = unique("sem-post-wait");
        let sem = NamedSemaphore::create(&name, 0).unwrap();

        sem.post().unwrap();
        sem.post().unwrap();
        assert_eq!(sem.value().unwrap(), 2);

        sem.wait().unwrap();
        assert_eq!(sem.value().unwrap(), 1);

        sem.unlink().unwrap();
    }

    #[test]
    fn test_open_sees_same_counter() {
        let name = unique("sem-open");
        let owner = NamedSemaphore::create(&name, 3).unwrap();
        let other = NamedSemaphore::open(&name).unwrap();

        other.wait().unwrap();
        assert_eq!(owner.value().unwrap(), 2);

        owner.unlink().unwrap();
    }

    #[test]
    fn test_open_missing_fails() {
        let err = NamedSemaphore::open(&unique("sem-missing")).unwrap_err();
        assert!(matches!(err, FanoutError::ResourceOpen { .. }));
    }

    #[test]
    fn test_create_replaces_stale() {
        let name = unique("sem-stale");
        let stale = NamedSemaphore::create(&name, 7).unwrap();
        drop(stale);

        let fresh = NamedSemaphore::create(&name, 0).unwrap();
        assert_eq!(fresh.value().unwrap(), 0);
        fresh.unlink().unwrap();
    }

    #[test]
    fn test_wait_blocks_until_post() {
        let name = unique("sem-block");
        let sem = Arc::new(NamedSemaphore::create(&name, 0).unwrap());

        let waiter = {
            let sem = sem.clone();
            std::thread::spawn(move || sem.wait())
        };

        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(!waiter.is_finished());

        sem.post().unwrap();
        waiter.join().unwrap().unwrap();
        sem.unlink().unwrap();
    }
}
