//! Configuration consumed by [`crate::Engine::open`].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default rollover threshold for a segment: 256 MiB.
pub const DEFAULT_DATA_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Selects which [`crate::Index`] implementation the engine builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexKind {
    /// A balanced, ordered in-memory tree. The only implementation shipped.
    #[default]
    SortedTree,
    /// Adaptive radix tree. Reserved for a future implementation; selecting
    /// it is a valid configuration but fails at open time.
    AdaptiveRadixTree,
}

/// Options controlling how an [`crate::Engine`] opens and maintains its
/// on-disk log.
///
/// Constructible directly, or via `Default` and field updates. The engine
/// only consumes this value; reading it from a file or the environment is
/// the host process's responsibility (e.g. via the `config` crate, which
/// can deserialize straight into this type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Options {
    /// Directory the engine's segments live in. Created if absent.
    pub directory: PathBuf,
    /// Byte threshold past which the active segment is rolled over.
    pub data_file_size: u64,
    /// Whether every `put`/`delete` syncs the active segment before
    /// returning.
    pub sync_writes: bool,
    /// Which index implementation to build at open time.
    pub index_kind: IndexKind,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            data_file_size: DEFAULT_DATA_FILE_SIZE,
            sync_writes: false,
            index_kind: IndexKind::SortedTree,
        }
    }
}

impl Options {
    /// Creates options pointed at `directory`, with all other fields
    /// defaulted.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), ..Default::default() }
    }

    /// Validates the options, per spec.md §4.5 step 1: an empty directory
    /// or a non-positive file size threshold is a configuration error.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.directory.as_os_str().is_empty() {
            return Err(Error::config_invalid("directory must not be empty"));
        }
        if self.data_file_size == 0 {
            return Err(Error::config_invalid("data_file_size must be positive"));
        }
        Ok(())
    }
}
