//! Slabmem - a size-classed slab memory allocator
//!
//! Backs an embedded key-value storage engine with fixed-size memory
//! chunks for engine-internal objects (cache items, index nodes).
//!
//! # Architecture
//!
//! ```text
//! SlabAllocator (Mutex-guarded facade)
//!   └─→ Arena
//!         ├─→ SizeClassTable  [48, 64, 80, 104, 136, ...]
//!         ├─→ SlabClass(48B)  → Free: [c3, c7], EndPage: slab 2
//!         ├─→ SlabClass(64B)  → Free: [],       EndPage: slab 0
//!         └─→ SlabClass(80B)  → Draining slab 1 (4 chunks outstanding)
//! ```
//!
//! Allocation order per class: free-list pop (LIFO), then bump from the
//! current end page, then grow by one page subject to the memory budget.
//! Ordinary `free` never returns memory to the system; pages are only
//! reclaimed through the per-class drain state machine.

#![warn(rust_2018_idioms)]

pub mod allocator;
pub mod arena;
pub mod bench;
pub mod chunk;
pub mod class;
pub mod config;
pub mod size_class;
pub mod slab;
pub mod stats;

// Re-exports for convenience
pub use allocator::SlabAllocator;
pub use chunk::ChunkId;
pub use config::SlabConfig;
pub use stats::{ArenaStats, ClassStats};

/// Slabmem error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("growth factor must be greater than 1.0, got {0}")]
        InvalidGrowthFactor(f64),

        #[error("memory limit of {limit} bytes cannot hold a single {page} byte page")]
        LimitTooSmall { limit: usize, page: usize },

        #[error("size class table overflow: {0} classes exceed the maximum of {1}")]
        TooManyClasses(usize, usize),

        #[error("unknown size class id: {0}")]
        UnknownClass(usize),

        #[error("class {class} has no slab at index {slab}")]
        UnknownSlab { class: usize, slab: u32 },

        #[error("class {class} is already draining slab {slab}")]
        AlreadyDraining { class: usize, slab: u32 },
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
