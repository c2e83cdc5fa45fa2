//! Stack-ordered scratch memory.
//!
//! [`ScratchArena`] is a fixed-capacity LIFO pool of `i32` words. Blocks are
//! handed out from the top of the stack and only the most recent block can
//! be released. [`ScratchArena::scoped`] wraps an allocation in a guard that
//! releases it when dropped, which is how the builder borrows its count grid.

use std::ops::{Deref, DerefMut};
use thiserror::Error;
use tracing::trace;

const WORD_BYTES: usize = std::mem::size_of::<i32>();

/// Errors that can occur during arena operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("Scratch arena out of memory: requested {requested} bytes, {remaining} bytes remaining")]
    OutOfMemory { requested: usize, remaining: usize },

    #[error("No outstanding scratch allocation to free")]
    NothingToFree,
}

/// Handle to an outstanding arena allocation.
#[derive(Debug, PartialEq, Eq)]
pub struct ScratchBlock {
    offset: usize,
    len: usize,
    generation: u64,
}

impl ScratchBlock {
    /// Length of the block in `i32` words.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Fixed-capacity LIFO scratch pool.
///
/// Capacity never grows: running out is reported as
/// [`ArenaError::OutOfMemory`] rather than reallocating, so callers sized for
/// a constrained board see the same failures the board would.
#[derive(Debug)]
pub struct ScratchArena {
    words: Vec<i32>,
    top: usize,
    // (start offset, generation) of outstanding blocks, most recent last
    marks: Vec<(usize, u64)>,
    generation: u64,
}

impl ScratchArena {
    /// Creates an arena able to hold `capacity_bytes`, rounded down to whole
    /// words.
    pub fn new(capacity_bytes: usize) -> Self {
        Self::with_words(capacity_bytes / WORD_BYTES)
    }

    /// Like [`new`](Self::new) but reports a failed backing allocation
    /// instead of aborting.
    pub fn try_new(capacity_bytes: usize) -> Result<Self, ArenaError> {
        Self::try_with_words(capacity_bytes / WORD_BYTES)
    }

    /// Creates an arena holding exactly `words` `i32` values.
    pub fn with_words(words: usize) -> Self {
        Self::from_backing(vec![0; words])
    }

    fn from_backing(words: Vec<i32>) -> Self {
        Self {
            words,
            top: 0,
            marks: Vec::new(),
            generation: 0,
        }
    }

    /// Like [`with_words`](Self::with_words) but reports a failed backing
    /// allocation instead of aborting.
    pub fn try_with_words(words: usize) -> Result<Self, ArenaError> {
        let mut backing = Vec::new();
        backing
            .try_reserve_exact(words)
            .map_err(|_| ArenaError::OutOfMemory {
                requested: words.saturating_mul(WORD_BYTES),
                remaining: 0,
            })?;
        backing.resize(words, 0);
        Ok(Self::from_backing(backing))
    }

    /// Reserves `size_bytes` (rounded up to whole words) on top of the stack.
    ///
    /// The returned block is zero-initialised.
    pub fn alloc(&mut self, size_bytes: usize) -> Result<ScratchBlock, ArenaError> {
        let len = size_bytes.div_ceil(WORD_BYTES);
        let end = match self.top.checked_add(len) {
            Some(end) if end <= self.words.len() => end,
            _ => {
                return Err(ArenaError::OutOfMemory {
                    requested: size_bytes,
                    remaining: self.remaining_bytes(),
                })
            }
        };

        let offset = self.top;
        let generation = self.generation;
        self.generation += 1;
        self.words[offset..end].fill(0);
        self.marks.push((offset, generation));
        self.top = end;
        trace!(offset, len, depth = self.marks.len(), "scratch alloc");

        Ok(ScratchBlock {
            offset,
            len,
            generation,
        })
    }

    /// Releases the most recent outstanding allocation.
    pub fn free_last(&mut self) -> Result<(), ArenaError> {
        let (offset, _) = self.marks.pop().ok_or(ArenaError::NothingToFree)?;
        trace!(offset, released = self.top - offset, "scratch free");
        self.top = offset;
        Ok(())
    }

    /// Mutable view of an outstanding block, `None` once it has been freed.
    ///
    /// Blocks are stamped with the generation of their allocation, so a
    /// freed block stays invalid even after a new block reuses its offset.
    pub fn words_mut(&mut self, block: &ScratchBlock) -> Option<&mut [i32]> {
        if !self.marks.contains(&(block.offset, block.generation)) {
            return None;
        }
        Some(&mut self.words[block.offset..block.offset + block.len])
    }

    /// Scoped allocation: the block is released when the guard drops,
    /// whichever way the borrowing scope exits.
    pub fn scoped(&mut self, size_bytes: usize) -> Result<ScratchGuard<'_>, ArenaError> {
        let block = self.alloc(size_bytes)?;
        Ok(ScratchGuard { arena: self, block })
    }

    pub fn capacity_bytes(&self) -> usize {
        self.words.len() * WORD_BYTES
    }

    pub fn used_bytes(&self) -> usize {
        self.top * WORD_BYTES
    }

    pub fn remaining_bytes(&self) -> usize {
        (self.words.len() - self.top) * WORD_BYTES
    }

    /// Number of outstanding allocations.
    pub fn depth(&self) -> usize {
        self.marks.len()
    }
}

/// Guard over the most recent arena allocation.
///
/// Holding the guard keeps the arena mutably borrowed, so no other
/// allocation can be stacked above it while it is alive.
pub struct ScratchGuard<'a> {
    arena: &'a mut ScratchArena,
    block: ScratchBlock,
}

impl Deref for ScratchGuard<'_> {
    type Target = [i32];

    fn deref(&self) -> &[i32] {
        &self.arena.words[self.block.offset..self.block.offset + self.block.len]
    }
}

impl DerefMut for ScratchGuard<'_> {
    fn deref_mut(&mut self) -> &mut [i32] {
        &mut self.arena.words[self.block.offset..self.block.offset + self.block.len]
    }
}

impl Drop for ScratchGuard<'_> {
    fn drop(&mut self) {
        // The guard's block is always on top while the guard lives.
        let _ = self.arena.free_last();
    }
}
