//! Allocator configuration

use serde::{Deserialize, Serialize};

/// Chunk sizes are rounded up to this alignment.
pub const CHUNK_ALIGN: usize = 8;

/// Default page size carved into chunks (1 MiB).
pub const DEFAULT_PAGE_SIZE: usize = 1024 * 1024;

/// Default smallest chunk size in bytes.
pub const DEFAULT_MIN_CHUNK: usize = 48;

/// Region reserved when preallocation is requested without a limit (64 MiB).
pub const DEFAULT_PREALLOC_BYTES: usize = 64 * 1024 * 1024;

/// Configuration for a [`SlabAllocator`](crate::SlabAllocator)
///
/// Host engines typically embed this in their own config file, so the
/// struct derives serde both ways.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlabConfig {
    /// Upper bound on bytes backing slabs, 0 = unbounded
    pub mem_limit: usize,
    /// Chunk size ratio between adjacent size classes (> 1.0)
    pub growth_factor: f64,
    /// Reserve the whole memory region up front and carve pages from it
    pub prealloc: bool,
    /// Bytes per slab page
    pub page_size: usize,
    /// Smallest chunk size served
    pub min_chunk: usize,
}

impl Default for SlabConfig {
    fn default() -> Self {
        Self {
            mem_limit: 0,
            growth_factor: 1.25,
            prealloc: false,
            page_size: DEFAULT_PAGE_SIZE,
            min_chunk: DEFAULT_MIN_CHUNK,
        }
    }
}

impl SlabConfig {
    /// Config with the given memory limit and defaults elsewhere
    pub fn with_limit(mem_limit: usize) -> Self {
        Self {
            mem_limit,
            ..Self::default()
        }
    }

    /// Bytes to reserve up front when `prealloc` is set
    pub fn prealloc_bytes(&self) -> usize {
        if self.mem_limit > 0 {
            self.mem_limit
        } else {
            DEFAULT_PREALLOC_BYTES
        }
    }
}

/// Round `size` up to the chunk alignment.
pub fn align_chunk(size: usize) -> usize {
    (size + CHUNK_ALIGN - 1) / CHUNK_ALIGN * CHUNK_ALIGN
}
