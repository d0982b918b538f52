//! A single segment of the append-only log. See spec.md §4.3.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::codec::{self, HeaderDecode, MAX_HEADER_SIZE};
use crate::error::{Error, Result};
use crate::io::{FileIoHandle, IoHandle};
use crate::record::LogRecord;

/// Suffix appended to every segment's zero-padded numeric id.
pub const DATA_FILE_SUFFIX: &str = ".data";

/// Builds the on-disk file name for segment `file_id`: a zero-padded
/// 9-digit decimal id followed by [`DATA_FILE_SUFFIX`], e.g.
/// `000000007.data`.
pub fn data_file_name(dir: &Path, file_id: u32) -> PathBuf {
    dir.join(format!("{file_id:09}{DATA_FILE_SUFFIX}"))
}

/// Outcome of a replay-time read, distinguishing a clean end-of-segment
/// from a torn (incomplete) trailing write.
pub(crate) enum ReplayRead {
    /// A well-formed record and its total on-disk size.
    Record(LogRecord, usize),
    /// No more data: all-zero padding, or too few bytes for a header.
    EndOfData,
    /// A header was readable but the file ends before its promised
    /// payload — the segment's last write was interrupted.
    Incomplete,
}

/// One segment: a contiguous prefix of whole encoded records from byte 0
/// up to `offset`, which always equals the file's physical size at rest.
pub(crate) struct DataFile {
    file_id: u32,
    offset: AtomicU64,
    io: Box<dyn IoHandle>,
}

impl DataFile {
    /// Opens or creates the segment `file_id` in `dir`. `offset` starts at
    /// 0; the engine sets it after replay for the active segment.
    pub(crate) fn open(dir: &Path, file_id: u32) -> Result<Self> {
        let io = FileIoHandle::open(&data_file_name(dir, file_id))?;
        Ok(Self { file_id, offset: AtomicU64::new(0), io: Box::new(io) })
    }

    pub(crate) fn file_id(&self) -> u32 {
        self.file_id
    }

    pub(crate) fn offset(&self) -> u64 {
        self.offset.load(Ordering::Acquire)
    }

    pub(crate) fn set_offset(&self, offset: u64) {
        self.offset.store(offset, Ordering::Release);
    }

    /// Reads and decodes the record starting at `offset`.
    ///
    /// Returns `Ok(None)` at a clean end-of-segment (all-zero padding or a
    /// header buffer too short to hold one). A CRC mismatch surfaces as
    /// [`Error::CorruptedRecord`]. Use [`DataFile::read_record`] for the
    /// common case; [`ReplayRead`] distinguishes a genuinely corrupt
    /// record from a torn tail write so the engine's replay can truncate
    /// an incomplete active segment instead of failing open.
    pub(crate) fn replay_read(&self, offset: u64) -> Result<ReplayRead> {
        let file_size = self.io.size()?;
        if offset >= file_size {
            return Ok(ReplayRead::EndOfData);
        }

        let header_span = MAX_HEADER_SIZE.min((file_size - offset) as usize);
        let mut header_buf = vec![0u8; header_span];
        let n = self.io.read_at(&mut header_buf, offset)?;
        header_buf.truncate(n);

        let (header, header_len) = match codec::decode_header(&header_buf) {
            HeaderDecode::Header(header, header_len) => (header, header_len),
            HeaderDecode::EndOfData => return Ok(ReplayRead::EndOfData),
        };

        let kv_len = header.key_size as usize + header.value_size as usize;
        let record_size = (header_len + kv_len) as u64;
        if offset + record_size > file_size {
            // The header is well-formed but the file ends before the
            // payload it promises: an incomplete (torn) write.
            return Ok(ReplayRead::Incomplete);
        }

        let mut kv_buf = vec![0u8; kv_len];
        if kv_len > 0 {
            self.io.read_at(&mut kv_buf, offset + header_len as u64)?;
        }

        match codec::decode_body(&header, &header_buf[..header_len], &kv_buf) {
            Some(record) => Ok(ReplayRead::Record(record, header_len + kv_len)),
            None => Err(Error::CorruptedRecord { file_id: self.file_id, offset }),
        }
    }

    /// Reads and decodes the record at `offset` for a point lookup.
    /// Treats a torn tail the same as any other corruption, since a live
    /// index entry should never point at an incomplete write.
    pub(crate) fn read_record(&self, offset: u64) -> Result<Option<(LogRecord, usize)>> {
        match self.replay_read(offset)? {
            ReplayRead::Record(record, size) => Ok(Some((record, size))),
            ReplayRead::EndOfData => Ok(None),
            ReplayRead::Incomplete => {
                Err(Error::CorruptedRecord { file_id: self.file_id, offset })
            }
        }
    }

    /// Appends already-encoded bytes, advancing `offset` by the number of
    /// bytes written. Invariant: after a successful append, `offset`
    /// equals the file's physical size.
    pub(crate) fn append(&self, bytes: &[u8]) -> Result<()> {
        let written = self.io.append(bytes)?;
        self.offset.fetch_add(written as u64, Ordering::AcqRel);
        Ok(())
    }

    pub(crate) fn sync(&self) -> Result<()> {
        self.io.sync()
    }

    /// Discards a torn trailing write, found during replay, by truncating
    /// the file to `len` and resetting `offset` to match.
    pub(crate) fn truncate(&self, len: u64) -> Result<()> {
        self.io.truncate(len)?;
        self.set_offset(len);
        Ok(())
    }

    pub(crate) fn close(&self) -> Result<()> {
        self.io.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;
    use crate::record::LogRecord;

    #[test]
    fn append_then_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFile::open(dir.path(), 0).unwrap();

        let r1 = LogRecord::normal(b"k1".to_vec(), b"v1".to_vec());
        let r2 = LogRecord::normal(b"k2".to_vec(), b"v2".to_vec());
        let e1 = encode(&r1);
        let e2 = encode(&r2);
        df.append(&e1).unwrap();
        df.append(&e2).unwrap();
        assert_eq!(df.offset(), (e1.len() + e2.len()) as u64);

        let (decoded1, size1) = df.read_record(0).unwrap().unwrap();
        assert_eq!(decoded1, r1);
        assert_eq!(size1, e1.len());

        let (decoded2, size2) = df.read_record(size1 as u64).unwrap().unwrap();
        assert_eq!(decoded2, r2);
        assert_eq!(size2, e2.len());
    }

    #[test]
    fn read_past_end_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFile::open(dir.path(), 0).unwrap();
        assert!(df.read_record(0).unwrap().is_none());
    }

    #[test]
    fn file_name_is_zero_padded() {
        let dir = PathBuf::from("/tmp/example");
        assert_eq!(data_file_name(&dir, 7), dir.join("000000007.data"));
        assert_eq!(data_file_name(&dir, 0), dir.join("000000000.data"));
    }

    #[test]
    fn corrupted_record_reports_file_id_and_offset() {
        let dir = tempfile::tempdir().unwrap();
        let df = DataFile::open(dir.path(), 3).unwrap();
        let r = LogRecord::normal(b"k".to_vec(), b"v".to_vec());
        let mut enc = encode(&r);
        let last = enc.len() - 1;
        enc[last] ^= 0xFF;
        df.append(&enc).unwrap();

        match df.read_record(0) {
            Err(Error::CorruptedRecord { file_id, offset }) => {
                assert_eq!(file_id, 3);
                assert_eq!(offset, 0);
            }
            other => panic!("expected CorruptedRecord, got {other:?}"),
        }
    }
}
