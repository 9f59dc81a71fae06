//! Chunked bump allocator addressed by index handles.
//!
//! ```text
//!  chunks[0] (4 KiB)      chunks[1] (8 KiB)          chunks[2] ...
//! ┌──────────────────┐   ┌──────────────────────┐
//! │ used │   free    │   │ used │     free      │
//! └──────────────────┘   └──────────────────────┘
//!            ▲
//!  ArenaSpan { chunk: 0, offset, len }
//! ```
//!
//! Allocations are never freed individually; everything is released when the
//! arena is dropped or [`reset`](Arena::reset). A span is a plain
//! `(chunk, offset, len)` triple, so it stays meaningful no matter where the
//! chunk buffer lives. Allocation takes `&mut self`: one arena per shard, and
//! the compiler refuses to share it between threads without a lock.

use tracing::{debug, warn};

use crate::error::ArenaError;

const MAX_CHUNK_BYTES: usize = u32::MAX as usize;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    pub initial_chunk_size: usize,
    pub growth_factor: usize,
    /// Past this chunk size, chunks grow by a constant step instead.
    pub linear_growth_threshold: usize,
    pub max_bytes: Option<usize>,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ArenaConfig {
    pub fn new() -> Self {
        Self {
            initial_chunk_size: 4096,
            growth_factor: 2,
            linear_growth_threshold: 128 * 1024 * 1024,
            max_bytes: None,
        }
    }

    pub fn with_initial_chunk_size(mut self, bytes: usize) -> Self {
        self.initial_chunk_size = bytes.max(1);
        self
    }

    pub fn with_growth(mut self, factor: usize, linear_threshold: usize) -> Self {
        self.growth_factor = factor.max(1);
        self.linear_growth_threshold = linear_threshold.max(1);
        self
    }

    pub fn with_max_bytes(mut self, limit: usize) -> Self {
        self.max_bytes = Some(limit);
        self
    }

    fn next_chunk_size(&self, current: usize) -> usize {
        if current < self.linear_growth_threshold {
            current.saturating_mul(self.growth_factor)
        } else {
            current.saturating_add(self.linear_growth_threshold)
        }
    }
}

/// Location of an allocation inside an [`Arena`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ArenaSpan {
    chunk: u32,
    offset: u32,
    len: u64,
}

impl ArenaSpan {
    /// Size of a span when written into arena memory.
    pub const ENCODED_LEN: usize = 16;

    pub fn chunk(&self) -> u32 {
        self.chunk
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `[chunk: u32 | offset: u32 | len: u64]`, little-endian.
    pub fn encode(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[0..4].copy_from_slice(&self.chunk.to_le_bytes());
        out[4..8].copy_from_slice(&self.offset.to_le_bytes());
        out[8..16].copy_from_slice(&self.len.to_le_bytes());
        out
    }

    /// Reads the first [`ENCODED_LEN`](Self::ENCODED_LEN) bytes of `bytes`.
    /// Panics if there are fewer.
    pub fn decode(bytes: &[u8]) -> Self {
        let Some(encoded) = bytes.first_chunk::<16>() else {
            panic!(
                "span descriptor needs {} bytes, got {}",
                Self::ENCODED_LEN,
                bytes.len()
            );
        };
        let word = u128::from_le_bytes(*encoded);
        Self {
            chunk: word as u32,
            offset: (word >> 32) as u32,
            len: (word >> 64) as u64,
        }
    }

    /// Span of `len` bytes starting `delta` bytes into this one.
    pub(crate) fn slice(&self, delta: usize, len: usize) -> Self {
        debug_assert!(delta + len <= self.len());
        Self {
            chunk: self.chunk,
            offset: self.offset + delta as u32,
            len: len as u64,
        }
    }
}

pub struct Arena {
    chunks: Vec<Vec<u8>>,
    config: ArenaConfig,
    next_chunk_size: usize,
    reserved: usize,
    allocated: usize,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new(ArenaConfig::default())
    }
}

impl Arena {
    pub fn new(config: ArenaConfig) -> Self {
        Self {
            chunks: Vec::new(),
            next_chunk_size: config.initial_chunk_size.max(1),
            config,
            reserved: 0,
            allocated: 0,
        }
    }

    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// Allocate `n` zeroed bytes.
    pub fn alloc(&mut self, n: usize) -> Result<ArenaSpan, ArenaError> {
        let span = self.claim(n)?;
        self.chunks[span.chunk as usize].resize(span.offset as usize + n, 0);
        Ok(span)
    }

    /// Allocate `bytes.len()` bytes holding a copy of `bytes`.
    pub fn alloc_copy(&mut self, bytes: &[u8]) -> Result<ArenaSpan, ArenaError> {
        let span = self.claim(bytes.len())?;
        self.chunks[span.chunk as usize].extend_from_slice(bytes);
        Ok(span)
    }

    /// Bytes behind `span`. Panics if the span was not produced by this arena
    /// since its last reset.
    #[inline(always)]
    pub fn bytes(&self, span: ArenaSpan) -> &[u8] {
        if span.len == 0 {
            return &[];
        }
        let start = span.offset as usize;
        &self.chunks[span.chunk as usize][start..start + span.len()]
    }

    pub fn bytes_mut(&mut self, span: ArenaSpan) -> &mut [u8] {
        if span.len == 0 {
            return &mut [];
        }
        let start = span.offset as usize;
        &mut self.chunks[span.chunk as usize][start..start + span.len()]
    }

    /// Bytes handed out by `alloc` calls since the last reset.
    pub fn allocated_bytes(&self) -> usize {
        self.allocated
    }

    /// Capacity of all chunks, used or not.
    pub fn reserved_bytes(&self) -> usize {
        self.reserved
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Release every chunk. All outstanding spans become invalid.
    pub fn reset(&mut self) {
        debug!(
            chunks = self.chunks.len(),
            reserved = self.reserved,
            "arena reset"
        );
        self.chunks.clear();
        self.next_chunk_size = self.config.initial_chunk_size.max(1);
        self.reserved = 0;
        self.allocated = 0;
    }

    /// Find room for `n` bytes at the end of the last chunk, opening a new
    /// chunk if needed. The caller appends exactly `n` bytes.
    fn claim(&mut self, n: usize) -> Result<ArenaSpan, ArenaError> {
        if n > MAX_CHUNK_BYTES {
            return Err(ArenaError::AllocationTooLarge { requested: n });
        }

        let fits = self
            .chunks
            .last()
            .is_some_and(|chunk| chunk.capacity() - chunk.len() >= n);
        if !fits {
            self.add_chunk(n)?;
        }

        let chunk_index = self.chunks.len() - 1;
        let chunk = u32::try_from(chunk_index)
            .map_err(|_| ArenaError::AllocationTooLarge { requested: n })?;
        let offset = self.chunks[chunk_index].len() as u32;
        self.allocated += n;
        Ok(ArenaSpan {
            chunk,
            offset,
            len: n as u64,
        })
    }

    fn add_chunk(&mut self, min_size: usize) -> Result<(), ArenaError> {
        let mut size = self.next_chunk_size.max(min_size).min(MAX_CHUNK_BYTES);

        if let Some(limit) = self.config.max_bytes {
            let remaining = limit.saturating_sub(self.reserved);
            if min_size > remaining {
                warn!(requested = min_size, limit, "arena limit reached");
                return Err(ArenaError::LimitExceeded {
                    requested: min_size,
                    limit,
                });
            }
            size = size.min(remaining);
        }

        let mut chunk = Vec::new();
        chunk
            .try_reserve_exact(size)
            .map_err(|_| ArenaError::OutOfMemory { requested: size })?;

        self.reserved += chunk.capacity();
        self.chunks.push(chunk);
        // A chunk capped by the limit must not shrink later growth.
        self.next_chunk_size = self
            .config
            .next_chunk_size(size)
            .max(self.config.initial_chunk_size)
            .max(1);
        debug!(
            chunk = self.chunks.len() - 1,
            size,
            reserved = self.reserved,
            "arena chunk added"
        );
        Ok(())
    }
}
