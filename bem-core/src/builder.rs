//! Binary event map construction.
//!
//! The builder accumulates signed polarity counts per pixel in a scratch grid
//! borrowed from a [`ScratchArena`], then thresholds the grid into a
//! caller-supplied map: a cell is 1 whenever ON and OFF events at that pixel
//! do not cancel exactly.
//!
//! The output buffer is always owned by the caller. Nothing the builder
//! returns points into the arena, so the arena can be reused immediately
//! after `build` returns.

use crate::arena::{ArenaError, ScratchArena};
use crate::types::{EventRecord, Geometry};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while building a binary event map.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BemError {
    #[error("Invalid dimensions {width}x{height}: width and height must be positive")]
    InvalidDimensions { width: i32, height: i32 },

    #[error("Output buffer holds {actual} bytes, expected {expected}")]
    OutputSizeMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    OutOfMemory(#[from] ArenaError),
}

/// Per-build counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Events that contributed to a pixel count
    pub accumulated: usize,
    /// In-range events whose type code is neither ON nor OFF
    pub ignored_type: usize,
    /// Events outside the frame, dropped silently
    pub out_of_range: usize,
    /// Cells set to 1 in the output
    pub active_pixels: usize,
}

/// Bytes of scratch one build needs for `geometry`.
pub fn scratch_bytes(geometry: Geometry) -> Option<usize> {
    geometry.len().checked_mul(std::mem::size_of::<i32>())
}

/// Allocates a zeroed output map for `geometry`, reporting allocation
/// failure instead of aborting.
pub fn alloc_map(geometry: Geometry) -> Result<Vec<u8>, BemError> {
    let mut map = Vec::new();
    map.try_reserve_exact(geometry.len())
        .map_err(|_| ArenaError::OutOfMemory {
            requested: geometry.len(),
            remaining: 0,
        })?;
    map.resize(geometry.len(), 0);
    Ok(map)
}

/// Builds binary event maps using scratch space from a borrowed arena.
///
/// The `&mut` borrow means a single arena can serve only one build at a
/// time.
pub struct BinaryEventMapBuilder<'a> {
    arena: &'a mut ScratchArena,
}

impl<'a> BinaryEventMapBuilder<'a> {
    pub fn new(arena: &'a mut ScratchArena) -> Self {
        Self { arena }
    }

    /// Builds the map for a `width` x `height` frame into `output`.
    ///
    /// `output` must hold exactly `width * height` bytes. Dimensions and
    /// output size are checked before anything is allocated, and `output`
    /// is left untouched on every error path.
    pub fn build(
        &mut self,
        width: i32,
        height: i32,
        events: &[EventRecord],
        output: &mut [u8],
    ) -> Result<BuildStats, BemError> {
        let geometry = Geometry::new(width, height)?;
        self.build_with_geometry(geometry, events, output)
    }

    /// Same as [`build`](Self::build) with pre-validated dimensions.
    pub fn build_with_geometry(
        &mut self,
        geometry: Geometry,
        events: &[EventRecord],
        output: &mut [u8],
    ) -> Result<BuildStats, BemError> {
        if output.len() != geometry.len() {
            return Err(BemError::OutputSizeMismatch {
                expected: geometry.len(),
                actual: output.len(),
            });
        }

        let grid_bytes = scratch_bytes(geometry).ok_or(ArenaError::OutOfMemory {
            requested: usize::MAX,
            remaining: self.arena.remaining_bytes(),
        })?;
        let mut counts = self.arena.scoped(grid_bytes)?;

        let mut stats = BuildStats::default();
        accumulate(geometry, events, &mut counts, &mut stats);
        stats.active_pixels = threshold(&counts, output);

        debug!(
            geometry = %geometry,
            events = events.len(),
            accumulated = stats.accumulated,
            out_of_range = stats.out_of_range,
            ignored_type = stats.ignored_type,
            active = stats.active_pixels,
            "built binary event map"
        );

        Ok(stats)
    }
}

/// Builds a map with a call-local scratch grid.
///
/// This is the preferred entry point when no shared arena is required: the
/// scratch buffer lives exactly as long as the call.
pub fn build_binary_event_map(
    width: i32,
    height: i32,
    events: &[EventRecord],
    output: &mut [u8],
) -> Result<BuildStats, BemError> {
    let geometry = Geometry::new(width, height)?;
    if output.len() != geometry.len() {
        return Err(BemError::OutputSizeMismatch {
            expected: geometry.len(),
            actual: output.len(),
        });
    }
    let mut arena = ScratchArena::try_with_words(geometry.len())?;
    BinaryEventMapBuilder::new(&mut arena).build_with_geometry(geometry, events, output)
}

fn accumulate(
    geometry: Geometry,
    events: &[EventRecord],
    counts: &mut [i32],
    stats: &mut BuildStats,
) {
    for event in events {
        let Some(idx) = geometry.index(event.x(), event.y()) else {
            stats.out_of_range += 1;
            continue;
        };

        match event.polarity() {
            Some(polarity) => {
                counts[idx] = counts[idx].wrapping_add(polarity.delta());
                stats.accumulated += 1;
            }
            None => stats.ignored_type += 1,
        }
    }
}

fn threshold(counts: &[i32], output: &mut [u8]) -> usize {
    let mut active = 0;
    for (cell, &count) in output.iter_mut().zip(counts) {
        *cell = (count != 0) as u8;
        active += *cell as usize;
    }
    active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(width: i32, height: i32, events: &[EventRecord]) -> Vec<u8> {
        let mut output = vec![0xAA; (width * height) as usize];
        build_binary_event_map(width, height, events, &mut output).unwrap();
        output
    }

    #[test]
    fn test_empty_events_all_zero() {
        let output = build(3, 5, &[]);
        assert_eq!(output.len(), 15);
        assert!(output.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_single_on_event() {
        let output = build(4, 4, &[EventRecord::new([1, 0, 0, 0, 1, 2])]);
        for (i, &cell) in output.iter().enumerate() {
            assert_eq!(cell, (i == 6) as u8, "cell {}", i);
        }
    }

    #[test]
    fn test_single_off_event_sets_cell() {
        let output = build(4, 4, &[EventRecord::at(0, 3, 2)]);
        assert_eq!(output[2 * 4 + 3], 1);
        assert_eq!(output.iter().filter(|&&v| v != 0).count(), 1);
    }

    #[test]
    fn test_on_off_cancel() {
        let events = [
            EventRecord::new([1, 0, 0, 0, 1, 2]),
            EventRecord::new([0, 0, 0, 0, 1, 2]),
        ];
        assert!(build(4, 4, &events).iter().all(|&v| v == 0));
    }

    #[test]
    fn test_out_of_range_dropped_silently() {
        let events = [
            EventRecord::new([1, 0, 0, 0, 5, 5]),
            EventRecord::at(1, 2, 0),
            EventRecord::at(1, 0, 2),
            EventRecord::at(0, -1, 0),
            EventRecord::at(0, 0, -1),
        ];
        let mut output = vec![0; 4];
        let stats = build_binary_event_map(2, 2, &events, &mut output).unwrap();
        assert!(output.iter().all(|&v| v == 0));
        assert_eq!(stats.out_of_range, 5);
        assert_eq!(stats.accumulated, 0);
    }

    #[test]
    fn test_unknown_type_is_noop() {
        let events = [EventRecord::at(2, 1, 1), EventRecord::at(-7, 1, 1)];
        let mut output = vec![0; 4];
        let stats = build_binary_event_map(2, 2, &events, &mut output).unwrap();
        assert!(output.iter().all(|&v| v == 0));
        assert_eq!(stats.ignored_type, 2);
    }

    #[test]
    fn test_reserved_fields_are_not_read() {
        let plain = build(4, 4, &[EventRecord::at(1, 1, 1)]);
        let noisy = build(4, 4, &[EventRecord::new([1, i32::MIN, -1, i32::MAX, 1, 1])]);
        assert_eq!(plain, noisy);
    }

    #[test]
    fn test_invalid_dimensions() {
        let mut output = vec![0u8; 4];
        assert_eq!(
            build_binary_event_map(0, 4, &[], &mut output),
            Err(BemError::InvalidDimensions {
                width: 0,
                height: 4
            })
        );
        assert!(build_binary_event_map(4, -1, &[], &mut output).is_err());
    }

    #[test]
    fn test_output_size_mismatch_leaves_output_untouched() {
        let mut arena = ScratchArena::new(1024);
        let mut output = vec![9u8; 5];
        let err = BinaryEventMapBuilder::new(&mut arena)
            .build(2, 2, &[EventRecord::at(1, 0, 0)], &mut output)
            .unwrap_err();
        assert_eq!(
            err,
            BemError::OutputSizeMismatch {
                expected: 4,
                actual: 5
            }
        );
        assert!(output.iter().all(|&v| v == 9));
        assert_eq!(arena.depth(), 0);
    }

    #[test]
    fn test_arena_exhausted_is_out_of_memory() {
        let mut arena = ScratchArena::new(15);
        let mut output = vec![9u8; 4];
        let err = BinaryEventMapBuilder::new(&mut arena)
            .build(2, 2, &[EventRecord::at(1, 0, 0)], &mut output)
            .unwrap_err();
        assert!(matches!(err, BemError::OutOfMemory(ArenaError::OutOfMemory { .. })));
        assert!(output.iter().all(|&v| v == 9));
        assert_eq!(arena.used_bytes(), 0);
    }

    #[test]
    fn test_arena_released_after_build() {
        let mut arena = ScratchArena::new(256);
        let outer = arena.alloc(16).unwrap();
        let before = arena.used_bytes();

        let mut output = vec![0u8; 16];
        let stats = BinaryEventMapBuilder::new(&mut arena)
            .build(4, 4, &[EventRecord::at(1, 0, 0)], &mut output)
            .unwrap();
        assert_eq!(stats.active_pixels, 1);
        assert_eq!(arena.used_bytes(), before);
        assert_eq!(arena.depth(), 1);
        assert!(arena.words_mut(&outer).is_some());
    }

    #[test]
    fn test_arena_reused_across_builds() {
        let mut arena = ScratchArena::new(16 * 4);
        let mut builder = BinaryEventMapBuilder::new(&mut arena);
        let mut first = vec![0u8; 16];
        let mut second = vec![0u8; 16];
        builder
            .build(4, 4, &[EventRecord::at(1, 0, 0)], &mut first)
            .unwrap();
        builder
            .build(4, 4, &[EventRecord::at(1, 3, 3)], &mut second)
            .unwrap();
        // stale counts from the first build must not leak into the second
        assert_eq!(second[0], 0);
        assert_eq!(second[15], 1);
    }

    #[test]
    fn test_alloc_map_sizes_to_geometry() {
        let map = alloc_map(Geometry::new(5, 3).unwrap()).unwrap();
        assert_eq!(map, vec![0u8; 15]);
    }

    #[test]
    fn test_stats_counts() {
        let events = [
            EventRecord::at(1, 0, 0),
            EventRecord::at(1, 0, 0),
            EventRecord::at(0, 1, 0),
            EventRecord::at(3, 1, 1),
            EventRecord::at(1, 9, 9),
        ];
        let mut output = vec![0u8; 4];
        let stats = build_binary_event_map(2, 2, &events, &mut output).unwrap();
        assert_eq!(
            stats,
            BuildStats {
                accumulated: 3,
                ignored_type: 1,
                out_of_range: 1,
                active_pixels: 2,
            }
        );
    }
}
