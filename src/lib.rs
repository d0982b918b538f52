//! An embedded, persistent key-value store following the Bitcask model:
//! an append-only segmented log of key/value records plus an in-memory
//! index of each live key's position. See `SPEC_FULL.md` for the full
//! module and operation contract.

#![warn(clippy::all)]
#![allow(clippy::new_without_default)]
#![allow(clippy::too_long_first_doc_paragraph)]

mod codec;
mod data_file;
mod engine;
mod error;
mod index;
mod io;
mod options;
mod record;

pub use engine::{Engine, EngineStats};
pub use error::{Error, Result};
pub use options::{IndexKind, Options, DEFAULT_DATA_FILE_SIZE};
pub use record::{LogRecord, RecordKind, RecordPosition};
