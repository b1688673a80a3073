//! Id allocation for the chunked fact tables.
//!
//! Allocators are plain values handed to the chunk builders, so the id state a chunk
//! depends on is always explicit at the call site.

use super::IdRange;
use crate::error::{OmopError, Result};

/// Per-chunk id blocks at fixed strides
///
/// Chunk `k` owns `[start + k * stride, start + (k + 1) * stride)`. The block of a
/// chunk depends only on its index, so chunks can be processed in any order or in
/// parallel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StridedIdAllocator {
    start: i64,
    stride: i64,
}

impl StridedIdAllocator {
    /// Allocator whose first block starts at `start`
    #[must_use]
    pub const fn new(start: i64, stride: i64) -> Self {
        Self { start, stride }
    }

    /// First id of a chunk's block
    #[must_use]
    pub fn chunk_start(&self, chunk: usize) -> i64 {
        self.start + self.stride * chunk as i64
    }

    /// Ids for `rows` rows of a chunk
    pub fn ids(&self, chunk: usize, rows: usize) -> Result<impl Iterator<Item = i64>> {
        if rows as i64 > self.stride {
            return Err(OmopError::InvalidData(format!(
                "chunk {chunk} has {rows} rows, more than its id block of {}",
                self.stride
            )));
        }
        let first = self.chunk_start(chunk);
        Ok((0..rows as i64).map(move |offset| first + offset))
    }
}

/// Ids continuing after the largest id handed out so far
///
/// The first block starts at the start of the range; every later block starts one
/// past the previous maximum. Chunks must therefore be allocated in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningIdAllocator {
    range: IdRange,
    last: Option<i64>,
}

impl RunningIdAllocator {
    /// Fresh allocator over `range`
    #[must_use]
    pub const fn new(range: IdRange) -> Self {
        Self { range, last: None }
    }

    /// Allocator continuing after ids already exported
    #[must_use]
    pub const fn resume(range: IdRange, last_exported: Option<i64>) -> Self {
        Self {
            range,
            last: last_exported,
        }
    }

    /// Reserve `rows` consecutive ids and return the first one
    ///
    /// # Errors
    /// Fails without reserving anything if the ids would leave the range.
    pub fn allocate(&mut self, rows: usize) -> Result<i64> {
        let first = self.last.map_or(self.range.start(), |last| last + 1);
        let end = i64::try_from(rows)
            .ok()
            .and_then(|rows| first.checked_add(rows))
            .filter(|end| *end <= self.range.end())
            .ok_or_else(|| self.range.exhausted(rows))?;
        if rows > 0 {
            self.last = Some(end - 1);
        }
        Ok(first)
    }

    /// Largest id handed out so far
    #[must_use]
    pub const fn last(&self) -> Option<i64> {
        self.last
    }
}
