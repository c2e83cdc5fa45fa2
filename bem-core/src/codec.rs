//! Conversion between host representations and [`EventRecord`]s.
//!
//! Host layers hand events over either as rows of integers or as a packed
//! little-endian buffer. Both are validated here, before they reach the
//! builder, which assumes every record carries all six fields.

use crate::types::{EventRecord, RECORD_BYTES, RECORD_FIELDS};
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// Errors raised while converting host data into event records.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("Event {index} has {arity} fields, expected at least 6")]
    MalformedEventArity { index: usize, arity: usize },

    #[error("Buffer of {len} bytes is not a whole number of 24-byte records")]
    TruncatedRecord { len: usize },

    #[error("Expected {expected} events, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Event count must not be negative, got {declared}")]
    NegativeCount { declared: i64 },
}

/// Converts rows of integers into records.
///
/// Each row must have at least six fields; anything past the sixth is
/// ignored.
pub fn records_from_rows<R: AsRef<[i32]>>(rows: &[R]) -> Result<Vec<EventRecord>, CodecError> {
    rows.iter()
        .enumerate()
        .map(|(index, row)| record_from_row(index, row.as_ref()))
        .collect()
}

/// Converts a single row, reporting `index` on arity errors.
#[inline]
pub fn record_from_row(index: usize, row: &[i32]) -> Result<EventRecord, CodecError> {
    if row.len() < RECORD_FIELDS {
        return Err(CodecError::MalformedEventArity {
            index,
            arity: row.len(),
        });
    }
    let mut fields = [0i32; RECORD_FIELDS];
    fields.copy_from_slice(&row[..RECORD_FIELDS]);
    Ok(EventRecord::new(fields))
}

/// Checks that a host-declared event count matches the events supplied.
pub fn check_count(expected: usize, actual: usize) -> Result<(), CodecError> {
    if expected != actual {
        return Err(CodecError::CountMismatch { expected, actual });
    }
    Ok(())
}

/// Checks a signed, host-declared event count against the events supplied.
pub fn check_declared_count(declared: i64, actual: usize) -> Result<(), CodecError> {
    let expected =
        usize::try_from(declared).map_err(|_| CodecError::NegativeCount { declared })?;
    check_count(expected, actual)
}

/// Decodes packed little-endian records (6 x i32 each).
pub fn records_from_le_bytes(bytes: &[u8]) -> Result<Vec<EventRecord>, CodecError> {
    if bytes.len() % RECORD_BYTES != 0 {
        return Err(CodecError::TruncatedRecord { len: bytes.len() });
    }

    Ok(bytes
        .chunks_exact(RECORD_BYTES)
        .map(|chunk| {
            let mut fields = [0i32; RECORD_FIELDS];
            LittleEndian::read_i32_into(chunk, &mut fields);
            EventRecord::new(fields)
        })
        .collect())
}

/// Encodes records as packed little-endian bytes, reserved fields included.
pub fn records_to_le_bytes(records: &[EventRecord]) -> Vec<u8> {
    let mut bytes = vec![0u8; records.len() * RECORD_BYTES];
    for (chunk, record) in bytes.chunks_exact_mut(RECORD_BYTES).zip(records) {
        LittleEndian::write_i32_into(&record.fields, chunk);
    }
    bytes
}
