//! The coordinator: holds the active segment, older segments, and the
//! index; exposes `put`/`get`/`delete`. See spec.md §4.5.

use std::collections::HashMap;
use std::fs;
use std::sync::RwLock;

use crate::codec;
use crate::data_file::{DataFile, ReplayRead, DATA_FILE_SUFFIX};
use crate::error::{Error, Result};
use crate::index::{self, Index};
use crate::options::Options;
use crate::record::{LogRecord, RecordPosition};

/// The mutable part of the engine's state: the active segment and the
/// read-only older segments. Guarded by a single reader-writer lock so
/// `put`/`delete` can hold exclusive access across the whole
/// append-and-index-update sequence while `get` only needs shared access.
struct EngineState {
    active: DataFile,
    older: HashMap<u32, DataFile>,
}

/// An open Bitcask-style store.
///
/// Cheap to share behind an `Arc` across reader threads; there is at most
/// one logical writer at a time (enforced by callers, not this type).
pub struct Engine {
    options: Options,
    index: Box<dyn Index>,
    state: RwLock<EngineState>,
}

/// A snapshot of the engine's size, returned by [`Engine::stat`].
#[derive(Debug, Clone, Copy)]
pub struct EngineStats {
    pub key_count: usize,
    pub active_file_id: u32,
    pub total_disk_size: u64,
}

impl Engine {
    /// Opens (or creates) a store rooted at `options.directory`.
    ///
    /// Validates `options`, creates the directory if absent, opens every
    /// `*.data` segment found, and replays them in ascending file-id order
    /// to rebuild the index. See spec.md §4.5 "Opening" and "Replay".
    pub fn open(options: Options) -> Result<Self> {
        options.validate()?;
        log::info!("opening database at {}", options.directory.display());

        fs::create_dir_all(&options.directory)?;
        let file_ids = discover_segment_ids(&options.directory)?;

        let mut segments: HashMap<u32, DataFile> = HashMap::new();
        for &id in &file_ids {
            segments.insert(id, DataFile::open(&options.directory, id)?);
        }

        let index = index::new_index(options.index_kind)?;

        let active_id = match file_ids.last() {
            Some(&id) => id,
            None => {
                let seg = DataFile::open(&options.directory, 0)?;
                segments.insert(0, seg);
                0
            }
        };

        for &id in &file_ids {
            let consumed = replay_segment(
                segments.get(&id).expect("segment just inserted"),
                id,
                id == active_id,
                &*index,
            )?;
            if id == active_id {
                segments.get(&active_id).expect("active segment present").set_offset(consumed);
            }
        }

        let active = segments.remove(&active_id).expect("active segment present");
        let older = segments;

        log::info!(
            "indexed {} live keys across {} segment(s) in {}",
            index.len(),
            older.len() + 1,
            options.directory.display()
        );

        Ok(Self { options, index, state: RwLock::new(EngineState { active, older }) })
    }

    /// Writes `value` under `key`. `key` must not be empty.
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::KeyIsEmpty);
        }
        let record = LogRecord::normal(key.to_vec(), value.to_vec());
        let position = self.append_log_record(&record)?;
        if !self.index.put(key.to_vec(), position) {
            return Err(Error::IndexUpdateFailed);
        }
        Ok(())
    }

    /// Returns the current value for `key`. `key` must not be empty.
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>> {
        if key.is_empty() {
            return Err(Error::KeyIsEmpty);
        }
        let position = self.index.get(key).ok_or(Error::KeyNotFound)?;

        let state = self.state.read().expect("engine lock poisoned");
        let record = if position.file_id == state.active.file_id() {
            state.active.read_record(position.offset as u64)?
        } else {
            let segment = state
                .older
                .get(&position.file_id)
                .ok_or(Error::DataFileNotFound { file_id: position.file_id })?;
            segment.read_record(position.offset as u64)?
        };
        drop(state);

        let (record, _size) = record.ok_or(Error::KeyNotFound)?;
        if record.is_tombstone() {
            return Err(Error::KeyNotFound);
        }
        Ok(record.value)
    }

    /// Marks `key` as deleted. Always durable, even if `key` was already
    /// absent (a redundant tombstone is still appended). `key` must not
    /// be empty.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        if key.is_empty() {
            return Err(Error::KeyIsEmpty);
        }
        if self.index.get(key).is_none() {
            return Ok(());
        }
        let record = LogRecord::tombstone(key.to_vec());
        self.append_log_record(&record)?;
        self.index.delete(key);
        Ok(())
    }

    /// Returns every live key, in sorted-index order.
    pub fn list_keys(&self) -> Vec<Vec<u8>> {
        self.index.keys()
    }

    /// Calls `f` with every live key and its current value.
    pub fn fold<F>(&self, mut f: F) -> Result<()>
    where
        F: FnMut(&[u8], &[u8]) -> Result<()>,
    {
        for key in self.index.keys() {
            let value = self.get(&key)?;
            f(&key, &value)?;
        }
        Ok(())
    }

    /// A size/key-count snapshot of the engine.
    pub fn stat(&self) -> Result<EngineStats> {
        let state = self.state.read().expect("engine lock poisoned");
        let mut total_disk_size = state.active.offset();
        for segment in state.older.values() {
            total_disk_size += segment.offset();
        }
        Ok(EngineStats {
            key_count: self.index.len(),
            active_file_id: state.active.file_id(),
            total_disk_size,
        })
    }

    /// Syncs the active segment and closes every open segment handle.
    pub fn close(&self) -> Result<()> {
        let state = self.state.read().expect("engine lock poisoned");
        state.active.sync()?;
        state.active.close()?;
        for segment in state.older.values() {
            segment.close()?;
        }
        Ok(())
    }

    /// Appends `record` to the active segment, rolling over first if it
    /// would push the segment past `options.data_file_size`. Holds the
    /// engine's write lock for the whole sequence. See spec.md §4.5
    /// "Append and Rollover".
    fn append_log_record(&self, record: &LogRecord) -> Result<RecordPosition> {
        let encoded = codec::encode(record);

        let mut state = self.state.write().expect("engine lock poisoned");
        if state.active.offset() + encoded.len() as u64 > self.options.data_file_size {
            state.active.sync()?;
            let prev_id = state.active.file_id();
            let new_active = DataFile::open(&self.options.directory, prev_id + 1)?;
            let prev_active = std::mem::replace(&mut state.active, new_active);
            state.older.insert(prev_id, prev_active);
        }

        let offset = state.active.offset();
        state.active.append(&encoded)?;
        if self.options.sync_writes {
            state.active.sync()?;
        }

        Ok(RecordPosition::new(state.active.file_id(), offset as i64))
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            log::error!("failed to close engine cleanly: {error}");
        }
    }
}

/// Enumerates `dir` for `*.data` files and parses each name's numeric
/// prefix, returning the ids sorted ascending. A non-numeric prefix is a
/// [`Error::DataDirCorrupted`].
fn discover_segment_ids(dir: &std::path::Path) -> Result<Vec<u32>> {
    let mut ids = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        let Some(prefix) = name.strip_suffix(DATA_FILE_SUFFIX) else { continue };
        let id: u32 = prefix.parse().map_err(|_| Error::data_dir_corrupted(&path))?;
        ids.push(id);
    }
    ids.sort_unstable();
    Ok(ids)
}

/// Replays `segment` from offset 0, updating `index` with the position of
/// every live record and removing tombstoned keys, per spec.md's
/// last-write-wins replay ordering. Returns the number of bytes
/// consumed.
///
/// A torn trailing write is only expected on the active segment (the one
/// that was open for writing when the process last stopped); there it
/// truncates the segment at the last good offset and ends replay for it,
/// resolving spec.md's "partial-tail recovery... left to the
/// implementer" open question. The same condition on an older, closed
/// segment indicates real corruption and fails the open.
fn replay_segment(segment: &DataFile, file_id: u32, is_active: bool, index: &dyn Index) -> Result<u64> {
    let mut offset = 0u64;
    loop {
        match segment.replay_read(offset)? {
            ReplayRead::Record(record, size) => {
                if record.is_tombstone() {
                    index.delete(&record.key);
                } else {
                    index.put(record.key.clone(), RecordPosition::new(file_id, offset as i64));
                }
                offset += size as u64;
            }
            ReplayRead::EndOfData => break,
            ReplayRead::Incomplete if is_active => {
                log::error!(
                    "segment {file_id:09} has a torn write at offset {offset}, truncating"
                );
                segment.truncate(offset)?;
                break;
            }
            ReplayRead::Incomplete => return Err(Error::CorruptedRecord { file_id, offset }),
        }
    }
    Ok(offset)
}
