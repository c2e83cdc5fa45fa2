//! Core types for polarity events and binary event maps.
//!
//! This module defines the fixed-arity event record handed to the builder,
//! the polarity codes it understands, and the validated frame geometry.

use crate::builder::BemError;

/// Number of integer fields in one event record.
pub const RECORD_FIELDS: usize = 6;

/// Size of one packed record on the wire (6 x i32, little-endian).
pub const RECORD_BYTES: usize = RECORD_FIELDS * std::mem::size_of::<i32>();

/// Field index of the polarity type.
pub const FIELD_TYPE: usize = 0;
/// Field index of the pixel row.
pub const FIELD_Y: usize = 4;
/// Field index of the pixel column.
pub const FIELD_X: usize = 5;

/// A single event record as produced by the sensor pipeline.
///
/// The field layout is `[type, r1, r2, r3, y, x]`. Fields 1-3 are reserved
/// (timestamp, id, ...) and are carried through untouched; the builder never
/// reads them. All fields use the canonical signed 32-bit wire width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(C)]
pub struct EventRecord {
    pub fields: [i32; RECORD_FIELDS],
}

impl EventRecord {
    /// Creates a record from its raw fields.
    #[inline]
    pub fn new(fields: [i32; RECORD_FIELDS]) -> Self {
        Self { fields }
    }

    /// Creates a record with zeroed reserved fields.
    #[inline]
    pub fn at(kind: i32, x: i32, y: i32) -> Self {
        Self::new([kind, 0, 0, 0, y, x])
    }

    /// Raw polarity type code (field 0).
    #[inline]
    pub fn kind(&self) -> i32 {
        self.fields[FIELD_TYPE]
    }

    /// Decoded polarity, `None` for codes other than 0 and 1.
    #[inline]
    pub fn polarity(&self) -> Option<Polarity> {
        Polarity::from_code(self.kind())
    }

    /// Pixel row (field 4).
    #[inline]
    pub fn y(&self) -> i32 {
        self.fields[FIELD_Y]
    }

    /// Pixel column (field 5).
    #[inline]
    pub fn x(&self) -> i32 {
        self.fields[FIELD_X]
    }

    /// The opaque fields 1-3.
    #[inline]
    pub fn reserved(&self) -> [i32; 3] {
        [self.fields[1], self.fields[2], self.fields[3]]
    }
}

impl From<[i32; RECORD_FIELDS]> for EventRecord {
    fn from(fields: [i32; RECORD_FIELDS]) -> Self {
        Self::new(fields)
    }
}

/// Event polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Polarity {
    /// Brightness decrease (code 0)
    Off = 0,
    /// Brightness increase (code 1)
    On = 1,
}

impl Polarity {
    /// Decodes a polarity type code. Unknown codes are not an error, they
    /// simply carry no polarity.
    #[inline]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Off),
            1 => Some(Self::On),
            _ => None,
        }
    }

    /// Signed contribution of this polarity to a pixel count.
    #[inline]
    pub fn delta(self) -> i32 {
        match self {
            Self::Off => -1,
            Self::On => 1,
        }
    }
}

/// Validated frame geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    width: usize,
    height: usize,
}

impl Geometry {
    /// Validates `width` and `height`. Both must be positive and their
    /// product must fit in `usize`.
    pub fn new(width: i32, height: i32) -> Result<Self, BemError> {
        if width <= 0 || height <= 0 {
            return Err(BemError::InvalidDimensions { width, height });
        }
        let (w, h) = (width as usize, height as usize);
        if w.checked_mul(h).is_none() {
            return Err(BemError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width: w,
            height: h,
        })
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of pixels (and of map cells).
    #[inline]
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    /// Always false: a validated geometry has at least one pixel.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Row-major cell index of `(x, y)`, or `None` when the coordinate lies
    /// outside the frame.
    #[inline]
    pub fn index(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 {
            return None;
        }
        let (x, y) = (x as usize, y as usize);
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(y * self.width + x)
    }
}

impl Default for Geometry {
    fn default() -> Self {
        // QVGA, the usual frame size on small vision boards
        Self {
            width: 320,
            height: 240,
        }
    }
}

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_field_layout() {
        let record = EventRecord::new([1, 10, 20, 30, 4, 5]);
        assert_eq!(record.kind(), 1);
        assert_eq!(record.y(), 4);
        assert_eq!(record.x(), 5);
        assert_eq!(record.reserved(), [10, 20, 30]);
        assert_eq!(std::mem::size_of::<EventRecord>(), RECORD_BYTES);
    }

    #[test]
    fn test_polarity_codes() {
        assert_eq!(Polarity::from_code(0), Some(Polarity::Off));
        assert_eq!(Polarity::from_code(1), Some(Polarity::On));
        assert_eq!(Polarity::from_code(2), None);
        assert_eq!(Polarity::from_code(-1), None);
        assert_eq!(Polarity::On.delta() + Polarity::Off.delta(), 0);
    }

    #[test]
    fn test_geometry_rejects_non_positive() {
        assert!(Geometry::new(0, 4).is_err());
        assert!(Geometry::new(4, 0).is_err());
        assert!(Geometry::new(-1, 4).is_err());
        assert!(Geometry::new(4, -3).is_err());
        assert_eq!(Geometry::new(4, 3).unwrap().len(), 12);
    }

    #[test]
    fn test_geometry_index_bounds() {
        let geometry = Geometry::new(4, 3).unwrap();
        assert_eq!(geometry.index(2, 1), Some(6));
        assert_eq!(geometry.index(3, 2), Some(11));
        assert_eq!(geometry.index(4, 0), None);
        assert_eq!(geometry.index(0, 3), None);
        assert_eq!(geometry.index(-1, 0), None);
        assert_eq!(geometry.index(0, -1), None);
    }
}
