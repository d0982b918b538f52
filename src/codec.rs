//! Binary framing for [`LogRecord`]: encode to bytes, decode from bytes,
//! verify CRC-32. See spec.md §4.2 for the on-disk layout.
//!
//! ```text
//! | crc:u32 | kind:u8 | key_size:varint | value_size:varint | key | value |
//! ```
//!
//! `key_size`/`value_size` are signed, zig-zag-encoded varints (7 bits per
//! byte, continuation bit set on all but the last byte). The CRC-32 (IEEE)
//! covers every byte from the end of the CRC field to the end of the
//! record.

use integer_encoding::VarInt;

use crate::record::{LogRecord, LogRecordHeader, RecordKind};

/// `4 (crc) + 1 (kind) + 5 (key_size varint) + 5 (value_size varint)`.
pub const MAX_HEADER_SIZE: usize = 4 + 1 + 5 + 5;

/// Outcome of decoding a record header from a byte buffer.
pub(crate) enum HeaderDecode {
    /// A well-formed header, and the number of bytes it occupied.
    Header(LogRecordHeader, usize),
    /// The buffer was too short, or the header was all-zero padding,
    /// signalling the logical end of the segment's data.
    EndOfData,
}

/// Encodes `record` to its on-disk byte representation.
pub fn encode(record: &LogRecord) -> Vec<u8> {
    let key_size = record.key.len() as i64;
    let value_size = record.value.len() as i64;

    let mut buf = Vec::with_capacity(MAX_HEADER_SIZE + record.key.len() + record.value.len());
    // Reserve the CRC field; filled in once the rest is written.
    buf.extend_from_slice(&[0u8; 4]);
    buf.push(record.kind.as_byte());
    buf.extend_from_slice(&key_size.encode_var_vec());
    buf.extend_from_slice(&value_size.encode_var_vec());
    buf.extend_from_slice(&record.key);
    buf.extend_from_slice(&record.value);

    let crc = crc32fast::hash(&buf[4..]);
    buf[0..4].copy_from_slice(&crc.to_le_bytes());
    buf
}

/// Decodes a header from the start of `buf`. Returns
/// [`HeaderDecode::EndOfData`] if `buf` is shorter than 5 bytes, or if the
/// decoded crc/key_size/value_size are all zero (end-of-data padding).
pub(crate) fn decode_header(buf: &[u8]) -> HeaderDecode {
    if buf.len() < 5 {
        return HeaderDecode::EndOfData;
    }
    let crc = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let kind_byte = buf[4];

    let Some((key_size, key_len)) = i64::decode_var(&buf[5..]) else {
        return HeaderDecode::EndOfData;
    };
    let Some((value_size, value_len)) = i64::decode_var(&buf[5 + key_len..]) else {
        return HeaderDecode::EndOfData;
    };

    // End-of-data padding: an unwritten tail reads back as all zero bytes.
    if crc == 0 && key_size == 0 && value_size == 0 {
        return HeaderDecode::EndOfData;
    }

    let Some(kind) = RecordKind::from_byte(kind_byte) else {
        return HeaderDecode::EndOfData;
    };

    let header_len = 5 + key_len + value_len;
    HeaderDecode::Header(
        LogRecordHeader { crc, kind, key_size: key_size as u32, value_size: value_size as u32 },
        header_len,
    )
}

/// Decodes the full record given its already-decoded header and the bytes
/// following it (exactly `header.key_size + header.value_size` long, plus
/// whatever the caller over-read). Verifies the CRC over `[4..end)` of the
/// full record, recomputed from `header_bytes` and `kv_bytes`.
///
/// Returns `None` on CRC mismatch; the caller (which knows the segment's
/// file id and the record's offset) is responsible for turning that into
/// an [`crate::Error::CorruptedRecord`].
pub(crate) fn decode_body(
    header: &LogRecordHeader,
    header_bytes: &[u8],
    kv_bytes: &[u8],
) -> Option<LogRecord> {
    let key_size = header.key_size as usize;
    let value_size = header.value_size as usize;

    let mut crc_input = Vec::with_capacity(header_bytes.len() - 4 + key_size + value_size);
    crc_input.extend_from_slice(&header_bytes[4..]);
    crc_input.extend_from_slice(&kv_bytes[..key_size + value_size]);
    let computed = crc32fast::hash(&crc_input);

    if computed != header.crc {
        return None;
    }

    let key = kv_bytes[..key_size].to_vec();
    let value = kv_bytes[key_size..key_size + value_size].to_vec();
    Some(LogRecord { key, value, kind: header.kind })
}
