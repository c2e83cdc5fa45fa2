//! Output writers for binary event maps.
//!
//! Supports binary PGM images, CSV grids and a raw binary dump with a small
//! header.

use crate::types::Geometry;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

/// Magic bytes opening a binary map file.
pub const MAP_MAGIC: &[u8; 8] = b"BEMMAP\0\0";

/// Errors that can occur during output writing.
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Map holds {actual} cells, geometry {geometry} needs {expected}")]
    SizeMismatch {
        geometry: Geometry,
        expected: usize,
        actual: usize,
    },
}

/// Output file layout for a map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapFormat {
    /// Binary PGM (P5), active cells at 255
    #[default]
    Pgm,
    /// One line per row of comma-separated 0/1 cells
    Csv,
    /// `BEMMAP` header followed by the raw cells
    Binary,
}

impl std::str::FromStr for MapFormat {
    type Err = OutputError;

    /// Parses a format name or file extension such as "pgm" or ".csv".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "pgm" => Ok(Self::Pgm),
            "csv" | "txt" => Ok(Self::Csv),
            "bin" | "raw" => Ok(Self::Binary),
            other => Err(OutputError::InvalidFormat(format!(
                "Unknown map format: {}. Use pgm, csv or bin",
                other
            ))),
        }
    }
}

impl MapFormat {
    /// Picks the format from a path's extension.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, OutputError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| OutputError::InvalidFormat("output has no extension".to_string()))?;
        ext.parse()
    }
}

/// Writer for binary event maps.
pub struct MapWriter<W: Write> {
    writer: BufWriter<W>,
    format: MapFormat,
}

impl<W: Write> MapWriter<W> {
    pub fn new(writer: W, format: MapFormat) -> Self {
        Self {
            writer: BufWriter::new(writer),
            format,
        }
    }

    /// Writes one map in the configured format.
    pub fn write_map(&mut self, map: &[u8], geometry: Geometry) -> Result<(), OutputError> {
        if map.len() != geometry.len() {
            return Err(OutputError::SizeMismatch {
                geometry,
                expected: geometry.len(),
                actual: map.len(),
            });
        }

        match self.format {
            MapFormat::Pgm => self.write_pgm(map, geometry),
            MapFormat::Csv => self.write_csv(map, geometry),
            MapFormat::Binary => self.write_binary(map, geometry),
        }
    }

    fn write_pgm(&mut self, map: &[u8], geometry: Geometry) -> Result<(), OutputError> {
        write!(
            self.writer,
            "P5\n{} {}\n255\n",
            geometry.width(),
            geometry.height()
        )?;
        for &cell in map {
            self.writer.write_u8(if cell != 0 { 255 } else { 0 })?;
        }
        Ok(())
    }

    fn write_csv(&mut self, map: &[u8], geometry: Geometry) -> Result<(), OutputError> {
        for row in map.chunks_exact(geometry.width()) {
            let cells: Vec<&str> = row
                .iter()
                .map(|&c| if c != 0 { "1" } else { "0" })
                .collect();
            writeln!(self.writer, "{}", cells.join(","))?;
        }
        Ok(())
    }

    fn write_binary(&mut self, map: &[u8], geometry: Geometry) -> Result<(), OutputError> {
        self.writer.write_all(MAP_MAGIC)?;
        // Version (u32)
        self.writer.write_u32::<LittleEndian>(1)?;
        self.writer.write_u32::<LittleEndian>(geometry.width() as u32)?;
        self.writer.write_u32::<LittleEndian>(geometry.height() as u32)?;
        self.writer.write_all(map)?;
        Ok(())
    }

    /// Flushes the writer.
    pub fn flush(&mut self) -> Result<(), OutputError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Writes a map to `path` in `format`.
pub fn write_map<P: AsRef<Path>>(
    path: P,
    map: &[u8],
    geometry: Geometry,
    format: MapFormat,
) -> Result<(), OutputError> {
    let file = File::create(path)?;
    let mut writer = MapWriter::new(file, format);
    writer.write_map(map, geometry)?;
    writer.flush()?;
    Ok(())
}
