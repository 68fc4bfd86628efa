//! Sequential-write sinks behind the access log lock

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::error::{FanoutError, Result};

/// Destination for encoded records.
///
/// Callers hold the access log lock for the whole call, so an
/// implementation only has to write the bytes it is given in one piece.
pub trait RecordSink: Send + Sync {
    /// Write one encoded record
    fn write_record(&self, record: &[u8]) -> io::Result<()>;
}

/// Append-mode file sink
#[derive(Debug)]
pub struct FileSink {
    file: File,
}

impl FileSink {
    /// Create or empty the log file
    pub fn truncate(path: &Path) -> Result<()> {
        File::create(path).map_err(|source| FanoutError::ResourceCreate {
            resource: format!("access log {}", path.display()),
            source,
        })?;
        Ok(())
    }

    /// Open an existing log file for appending
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|source| FanoutError::ResourceOpen {
                resource: format!("access log {}", path.display()),
                source,
            })?;
        Ok(Self { file })
    }
}

impl RecordSink for FileSink {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        // write_all restarts on EINTR
        (&self.file).write_all(record)
    }
}

/// In-memory sink
#[derive(Debug, Default)]
pub struct MemorySink {
    buf: Mutex<BytesMut>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written so far
    pub fn contents(&self) -> Bytes {
        self.buf.lock().clone().freeze()
    }
}

impl RecordSink for MemorySink {
    fn write_record(&self, record: &[u8]) -> io::Result<()> {
        self.buf.lock().extend_from_slice(record);
        Ok(())
    }
}

/// Sink that rejects every write; used to inject append faults
#[derive(Debug)]
pub struct FailingSink {
    reason: String,
}

impl FailingSink {
    /// Create a sink failing with the given reason
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl RecordSink for FailingSink {
    fn write_record(&self, _record: &[u8]) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::Other, self.reason.clone()))
    }
}
