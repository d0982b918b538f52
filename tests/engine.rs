//! End-to-end scenarios exercising the engine against a real directory.

use kvbitcask::{Engine, Error, Options};

fn open(dir: &std::path::Path) -> Engine {
    Engine::open(Options::new(dir)).expect("open")
}

#[test]
fn fresh_open_put_get_last_write_wins() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());

    engine.put(b"a", b"1").unwrap();
    engine.put(b"a", b"2").unwrap();
    assert_eq!(engine.get(b"a").unwrap(), b"2");

    engine.close().unwrap();

    let reopened = open(dir.path());
    assert_eq!(reopened.get(b"a").unwrap(), b"2");
}

#[test]
fn multi_segment_rollover_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = Options::new(dir.path());
    options.data_file_size = 40;
    let engine = Engine::open(options.clone()).unwrap();

    for i in 0..50u32 {
        let key = format!("key-{i:04}");
        let value = format!("value-{i:04}");
        engine.put(key.as_bytes(), value.as_bytes()).unwrap();
    }
    let stats = engine.stat().unwrap();
    assert!(stats.active_file_id > 0, "expected rollover to have occurred");
    engine.close().unwrap();

    let reopened = Engine::open(options).unwrap();
    for i in 0..50u32 {
        let key = format!("key-{i:04}");
        let value = format!("value-{i:04}");
        assert_eq!(reopened.get(key.as_bytes()).unwrap(), value.as_bytes());
    }
    assert_eq!(reopened.stat().unwrap().key_count, 50);
}

#[test]
fn sync_writes_survive_without_explicit_close() {
    let dir = tempfile::tempdir().unwrap();
    let mut options = Options::new(dir.path());
    options.sync_writes = true;
    {
        let engine = Engine::open(options.clone()).unwrap();
        engine.put(b"durable", b"yes").unwrap();
        // Dropped without calling close(); Drop still flushes.
    }

    let reopened = Engine::open(options).unwrap();
    assert_eq!(reopened.get(b"durable").unwrap(), b"yes");
}

#[test]
fn corrupted_value_bytes_surface_as_corrupted_record() {
    let dir = tempfile::tempdir().unwrap();
    {
        let engine = open(dir.path());
        engine.put(b"k", b"some value").unwrap();
        engine.close().unwrap();
    }

    let segment_path = dir.path().join("000000000.data");
    let mut bytes = std::fs::read(&segment_path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&segment_path, bytes).unwrap();

    match Engine::open(Options::new(dir.path())) {
        Err(Error::CorruptedRecord { .. }) => {}
        other => panic!("expected CorruptedRecord on open, got {other:?}"),
    }
}

#[test]
fn non_numeric_segment_name_reports_data_dir_corrupted() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("abc.data"), b"").unwrap();

    match Engine::open(Options::new(dir.path())) {
        Err(Error::DataDirCorrupted { .. }) => {}
        other => panic!("expected DataDirCorrupted, got {other:?}"),
    }
}

#[test]
fn deleted_key_stays_gone_after_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let options = Options::new(dir.path());
    {
        let engine = Engine::open(options.clone()).unwrap();
        engine.put(b"k", b"v").unwrap();
        engine.delete(b"k").unwrap();
        assert!(matches!(engine.get(b"k"), Err(Error::KeyNotFound)));
        engine.close().unwrap();
    }

    let reopened = Engine::open(options).unwrap();
    assert!(matches!(reopened.get(b"k"), Err(Error::KeyNotFound)));
    assert_eq!(reopened.list_keys().len(), 0);
}

#[test]
fn delete_of_absent_key_is_a_no_op_success() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    assert!(engine.delete(b"never-existed").is_ok());
}

#[test]
fn empty_key_is_rejected_on_every_operation() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    assert!(matches!(engine.put(b"", b"v"), Err(Error::KeyIsEmpty)));
    assert!(matches!(engine.get(b""), Err(Error::KeyIsEmpty)));
    assert!(matches!(engine.delete(b""), Err(Error::KeyIsEmpty)));
}

/// Mirrors the teacher's `recovery` test: write a few entries to a single
/// (active) segment, then truncate a copy of it at *every* byte boundary
/// and check that opening always recovers exactly the expected prefix of
/// entries, never fails, and never returns a partial/torn one.
#[test]
fn torn_active_segment_tail_is_truncated_not_fatal() {
    let source_dir = tempfile::tempdir().unwrap();
    let mut ends = vec![];
    {
        let engine = open(source_dir.path());
        engine.put(b"deleted", &[1, 2, 3]).unwrap();
        ends.push(engine.stat().unwrap().total_disk_size);
        engine.delete(b"deleted").unwrap();
        ends.push(engine.stat().unwrap().total_disk_size);
        engine.put(b"empty", &[]).unwrap();
        ends.push(engine.stat().unwrap().total_disk_size);
        engine.put(b"key", &[1, 2, 3, 4, 5]).unwrap();
        ends.push(engine.stat().unwrap().total_disk_size);
        engine.close().unwrap();
    }

    let segment_path = source_dir.path().join("000000000.data");
    let size = std::fs::metadata(&segment_path).unwrap().len();

    for pos in 0..=size {
        let trunc_dir = tempfile::tempdir().unwrap();
        let trunc_path = trunc_dir.path().join("000000000.data");
        std::fs::copy(&segment_path, &trunc_path).unwrap();
        let file = std::fs::OpenOptions::new().write(true).open(&trunc_path).unwrap();
        file.set_len(pos).unwrap();
        drop(file);

        let mut expect: std::collections::BTreeMap<Vec<u8>, Vec<u8>> = std::collections::BTreeMap::new();
        if pos >= ends[0] {
            expect.insert(b"deleted".to_vec(), vec![1, 2, 3]);
        }
        if pos >= ends[1] {
            expect.remove(b"deleted".as_slice());
        }
        if pos >= ends[2] {
            expect.insert(b"empty".to_vec(), vec![]);
        }
        if pos >= ends[3] {
            expect.insert(b"key".to_vec(), vec![1, 2, 3, 4, 5]);
        }

        let engine = Engine::open(Options::new(trunc_dir.path())).unwrap();
        let mut actual = std::collections::BTreeMap::new();
        engine
            .fold(|k, v| {
                actual.insert(k.to_vec(), v.to_vec());
                Ok(())
            })
            .unwrap();
        assert_eq!(actual, expect, "mismatch truncating at byte {pos} of {size}");
    }
}

#[test]
fn list_keys_and_fold_reflect_live_keys() {
    let dir = tempfile::tempdir().unwrap();
    let engine = open(dir.path());
    engine.put(b"b", b"2").unwrap();
    engine.put(b"a", b"1").unwrap();
    engine.put(b"c", b"3").unwrap();
    engine.delete(b"b").unwrap();

    assert_eq!(engine.list_keys(), vec![b"a".to_vec(), b"c".to_vec()]);

    let mut seen = Vec::new();
    engine
        .fold(|k, v| {
            seen.push((k.to_vec(), v.to_vec()));
            Ok(())
        })
        .unwrap();
    assert_eq!(seen, vec![(b"a".to_vec(), b"1".to_vec()), (b"c".to_vec(), b"3".to_vec())]);
}
