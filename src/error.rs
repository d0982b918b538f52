//! Error types returned by the storage engine.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`crate::Engine`] and its collaborators.
///
/// Every fallible operation in this crate returns one of these variants;
/// none are swallowed internally.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller passed a zero-length key to `put`, `get`, or `delete`.
    #[error("key is empty")]
    KeyIsEmpty,

    /// The key was not found in the index, or resolved to a tombstone.
    #[error("key not found")]
    KeyNotFound,

    /// An index entry points at a segment that isn't open. Indicates a
    /// broken invariant between the index and the engine's segment set.
    #[error("data file {file_id} not found")]
    DataFileNotFound {
        /// The file id the index pointed at.
        file_id: u32,
    },

    /// The index implementation refused to record an insertion.
    #[error("failed to update index")]
    IndexUpdateFailed,

    /// A filename in the data directory could not be parsed as a segment id.
    #[error("data directory corrupted: invalid segment file name {name:?}")]
    DataDirCorrupted {
        /// The offending file name.
        name: String,
    },

    /// A record's CRC did not match its contents.
    #[error("corrupted record in segment {file_id} at offset {offset}")]
    CorruptedRecord {
        /// The segment the record was read from.
        file_id: u32,
        /// The byte offset the record starts at.
        offset: u64,
    },

    /// The supplied `Options` failed validation.
    #[error("invalid configuration: {reason}")]
    ConfigInvalid {
        /// Human-readable description of what failed validation.
        reason: String,
    },

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Builds a [`Error::DataDirCorrupted`] for the given path's file name.
    pub(crate) fn data_dir_corrupted(path: &std::path::Path) -> Self {
        Error::DataDirCorrupted { name: path.display().to_string() }
    }

    /// Builds a [`Error::ConfigInvalid`] with the given reason.
    pub(crate) fn config_invalid(reason: impl Into<String>) -> Self {
        Error::ConfigInvalid { reason: reason.into() }
    }
}
