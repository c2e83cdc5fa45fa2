//! Binary event maps for event-based vision sensors.
//!
//! This crate turns a batch of polarity events into a per-pixel binary
//! occupancy map for one frame. ON events increment and OFF events decrement
//! a signed count per pixel; every pixel whose count ends up non-zero is set.
//!
//! # Example
//!
//! ```
//! use bem_core::{build_binary_event_map, EventRecord};
//!
//! // [type, r1, r2, r3, y, x]
//! let events = [EventRecord::new([1, 0, 0, 0, 1, 2])];
//! let mut map = vec![0u8; 4 * 4];
//! build_binary_event_map(4, 4, &events, &mut map).unwrap();
//!
//! assert_eq!(map[1 * 4 + 2], 1);
//! ```
//!
//! # Scratch memory
//!
//! The count grid is borrowed from a stack-ordered [`ScratchArena`] and
//! released before `build` returns, on success and on error alike. The map
//! itself is always written into a caller-supplied buffer, so nothing
//! returned by the builder depends on the arena staying untouched.

pub mod arena;
pub mod builder;
pub mod codec;
pub mod input;
pub mod output;
pub mod types;

// Re-export commonly used types
pub use arena::{ArenaError, ScratchArena, ScratchGuard};
pub use builder::{
    alloc_map, build_binary_event_map, BemError, BinaryEventMapBuilder, BuildStats,
};
pub use codec::CodecError;
pub use input::{EventBatch, InputError};
pub use output::{MapFormat, OutputError};
pub use types::{EventRecord, Geometry, Polarity};
