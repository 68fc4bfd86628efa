//! Fixed-width access log records

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FanoutError, Result};

/// Worker identifier, 0..N-1
pub type WorkerId = u32;

/// Size in bytes of one encoded record
pub const RECORD_WIDTH: usize = std::mem::size_of::<WorkerId>();

/// One access log entry: the id of the worker whose task appended it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogRecord {
    worker_id: WorkerId,
}

impl LogRecord {
    /// Create a record for a worker
    pub fn new(worker_id: WorkerId) -> Self {
        Self { worker_id }
    }

    /// Owning worker
    pub fn worker_id(&self) -> WorkerId {
        self.worker_id
    }

    /// Little-endian encoding, always `RECORD_WIDTH` bytes
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(RECORD_WIDTH);
        buf.put_u32_le(self.worker_id);
        buf.freeze()
    }
}

/// Decode a back-to-back sequence of records.
///
/// A trailing partial record means the log was torn and is rejected.
pub fn decode_records(mut data: &[u8]) -> Result<Vec<WorkerId>> {
    if data.len() % RECORD_WIDTH != 0 {
        return Err(FanoutError::CorruptLog {
            len: data.len(),
            width: RECORD_WIDTH,
        });
    }

    let mut ids = Vec::with_capacity(data.len() / RECORD_WIDTH);
    while data.has_remaining() {
        ids.push(data.get_u32_le());
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_is_fixed_width() {
        assert_eq!(LogRecord::new(0).encode().len(), RECORD_WIDTH);
        assert_eq!(LogRecord::new(u32::MAX).encode().len(), RECORD_WIDTH);
    }

    #[test]
    fn test_decode_sequence() {
        let mut data = Vec::new();
        for id in [3, 1, 4, 1] {
            data.extend_from_slice(&LogRecord::new(id).encode());
        }
        assert_eq!(decode_records(&data).unwrap(), vec![3, 1, 4, 1]);
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode_records(&[]).unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_torn_record() {
        let mut data = LogRecord::new(9).encode().to_vec();
        data.push(0xff);

        let err = decode_records(&data).unwrap_err();
        assert!(err.is_corruption());
    }
}
