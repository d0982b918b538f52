//! The file-descriptor abstraction consumed by [`crate::data_file::DataFile`].
//!
//! Out of scope per spec.md §1 beyond "the operations the core consumes";
//! this module provides the one implementation the engine actually uses,
//! [`FileIoHandle`], backed directly by `std::fs::File`.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use fs4::FileExt;

use crate::error::Result;

/// Positioned-read, append-only-write, sync, size, close — the capability
/// set a [`crate::data_file::DataFile`] needs from an open file.
pub(crate) trait IoHandle: Send + Sync {
    /// Reads into `buf` starting at `offset`. May return fewer bytes than
    /// `buf.len()` only at end-of-file.
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;
    /// Appends `buf` to the current end of the file. Writes all bytes or
    /// fails.
    fn append(&self, buf: &[u8]) -> Result<usize>;
    /// Flushes OS buffers to durable media.
    fn sync(&self) -> Result<()>;
    /// Current file length in bytes.
    fn size(&self) -> Result<u64>;
    /// Releases the underlying descriptor. A no-op beyond `Drop` for
    /// `std::fs::File`, kept as an explicit operation so callers can
    /// observe close-time errors (spec.md §6 lists `close()` as fallible).
    fn close(&self) -> Result<()>;
    /// Truncates the file to exactly `len` bytes. Used only to discard an
    /// incomplete trailing write discovered during replay.
    fn truncate(&self, len: u64) -> Result<()>;
}

/// An [`IoHandle`] backed by a single open `std::fs::File`.
///
/// Opened create-if-absent, read+append, mode 0644 on unix. The file is
/// opened in append mode so writes always extend the file regardless of
/// the handle's last-seen logical offset (spec.md §4.1), and an advisory
/// exclusive lock is held for the file's lifetime so a second engine
/// cannot open the same segment concurrently.
pub(crate) struct FileIoHandle {
    file: File,
}

impl FileIoHandle {
    pub(crate) fn open(path: &Path) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }
        let file = options.open(path)?;
        file.try_lock_exclusive()?;
        Ok(Self { file })
    }
}

impl IoHandle for FileIoHandle {
    fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        // `pread`/`seek_read` take the offset as an argument instead of
        // moving a shared cursor, so concurrent readers on the same `File`
        // (or a `try_clone` of it, which shares the cursor) never race each
        // other the way seek-then-read would.
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            let mut total = 0;
            loop {
                match self.file.read_at(&mut buf[total..], offset + total as u64) {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
                if total == buf.len() {
                    break;
                }
            }
            Ok(total)
        }

        #[cfg(windows)]
        {
            use std::os::windows::fs::FileExt;
            let mut total = 0;
            loop {
                match self.file.seek_read(&mut buf[total..], offset + total as u64) {
                    Ok(0) => break,
                    Ok(n) => total += n,
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e.into()),
                }
                if total == buf.len() {
                    break;
                }
            }
            Ok(total)
        }
    }

    fn append(&self, buf: &[u8]) -> Result<usize> {
        let mut handle = self.file.try_clone()?;
        handle.write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> Result<()> {
        self.file.sync_all()?;
        Ok(())
    }

    fn size(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }

    fn close(&self) -> Result<()> {
        self.sync()
    }

    fn truncate(&self, len: u64) -> Result<()> {
        self.file.set_len(len)?;
        Ok(())
    }
}
