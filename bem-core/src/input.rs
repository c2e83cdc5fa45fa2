//! Event file readers.
//!
//! Two layouts are understood:
//!
//! - text: optional `%` header lines (`% geometry 320x240`), then one event
//!   per line as six comma-separated integers `type,r1,r2,r3,y,x`
//! - binary: `BEMEVT\0\0`, version (u32), width (i32), height (i32),
//!   event count (u64), then packed little-endian records

use crate::builder::BemError;
use crate::codec::{self, CodecError};
use crate::types::{EventRecord, Geometry};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;
use thiserror::Error;

/// Magic bytes opening a binary event file.
pub const EVENTS_MAGIC: &[u8; 8] = b"BEMEVT\0\0";

/// Current binary event file version.
pub const EVENTS_VERSION: u32 = 1;

/// Errors that can occur while reading event files.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Invalid geometry in header: {0}")]
    Geometry(#[from] BemError),
}

/// Events read from a file, with the geometry its header declared.
#[derive(Debug, Clone, Default)]
pub struct EventBatch {
    pub records: Vec<EventRecord>,
    pub geometry: Option<Geometry>,
}

/// Reads an event file, choosing the layout from its extension
/// (`.bin` is binary, everything else is text).
pub fn read_events<P: AsRef<Path>>(path: P) -> Result<EventBatch, InputError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);

    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("bin") => read_binary(reader),
        _ => read_text(reader),
    }
}

/// Reads the text layout.
pub fn read_text<R: BufRead>(mut reader: R) -> Result<EventBatch, InputError> {
    let mut batch = EventBatch::default();
    let mut line = String::new();
    let mut line_no = 0;

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.starts_with('%') {
            if let Some(geometry) = parse_header_line(trimmed, line_no)? {
                batch.geometry = Some(geometry);
            }
            continue;
        }

        let row = parse_row(trimmed, line_no)?;
        let record = codec::record_from_row(batch.records.len(), &row)?;
        batch.records.push(record);
    }

    Ok(batch)
}

/// Parses a `%` header line. Unknown keys are ignored.
fn parse_header_line(line: &str, line_no: usize) -> Result<Option<Geometry>, InputError> {
    let body = line.trim_start_matches('%').trim();

    // Format: "% geometry 320x240"
    let Some(dims) = body.strip_prefix("geometry") else {
        return Ok(None);
    };
    let dims = dims.trim();
    let parsed = dims
        .split_once('x')
        .and_then(|(w, h)| Some((w.trim().parse().ok()?, h.trim().parse().ok()?)));

    match parsed {
        Some((w, h)) => Ok(Some(Geometry::new(w, h)?)),
        None => Err(InputError::Parse {
            line: line_no,
            message: format!("malformed geometry '{}', expected WIDTHxHEIGHT", dims),
        }),
    }
}

fn parse_row(line: &str, line_no: usize) -> Result<Vec<i32>, InputError> {
    line.split(',')
        .map(|field| {
            let field = field.trim();
            field.parse::<i32>().map_err(|e| InputError::Parse {
                line: line_no,
                message: format!("invalid field '{}': {}", field, e),
            })
        })
        .collect()
}

/// Reads the binary layout.
pub fn read_binary<R: Read>(mut reader: R) -> Result<EventBatch, InputError> {
    let mut magic = [0u8; 8];
    reader.read_exact(&mut magic)?;
    if &magic != EVENTS_MAGIC {
        return Err(InputError::InvalidFormat("missing BEMEVT magic".to_string()));
    }

    let version = reader.read_u32::<LittleEndian>()?;
    if version != EVENTS_VERSION {
        return Err(InputError::InvalidFormat(format!(
            "unsupported version {}",
            version
        )));
    }

    let width = reader.read_i32::<LittleEndian>()?;
    let height = reader.read_i32::<LittleEndian>()?;
    let count = reader.read_u64::<LittleEndian>()?;
    let geometry = Geometry::new(width, height)?;

    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let records = codec::records_from_le_bytes(&bytes)?;
    codec::check_count(count as usize, records.len())?;

    Ok(EventBatch {
        records,
        geometry: Some(geometry),
    })
}

/// Writes events in the binary layout.
pub fn write_binary<W: Write>(
    mut writer: W,
    geometry: Geometry,
    records: &[EventRecord],
) -> Result<(), InputError> {
    writer.write_all(EVENTS_MAGIC)?;
    writer.write_u32::<LittleEndian>(EVENTS_VERSION)?;
    writer.write_i32::<LittleEndian>(geometry.width() as i32)?;
    writer.write_i32::<LittleEndian>(geometry.height() as i32)?;
    writer.write_u64::<LittleEndian>(records.len() as u64)?;
    writer.write_all(&codec::records_to_le_bytes(records))?;
    writer.flush()?;
    Ok(())
}

/// Writes events in the text layout.
pub fn write_text<W: Write>(
    mut writer: W,
    geometry: Option<Geometry>,
    records: &[EventRecord],
) -> Result<(), InputError> {
    if let Some(geometry) = geometry {
        writeln!(writer, "% geometry {}", geometry)?;
    }
    for record in records {
        let fields: Vec<String> = record.fields.iter().map(|f| f.to_string()).collect();
        writeln!(writer, "{}", fields.join(","))?;
    }
    writer.flush()?;
    Ok(())
}
