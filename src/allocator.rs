//! Lock-guarded public surface of the slab allocator
//!
//! One `SlabAllocator` per engine instance; engines running side by side
//! get independent arenas. Every operation takes the single arena mutex
//! for its full duration. Calls are short and never block inside the
//! lock (no I/O, no recursive allocation), so coarse locking keeps the
//! allocator simple without hurting the engine's hot path.

use crate::arena::Arena;
use crate::chunk::ChunkId;
use crate::config::SlabConfig;
use crate::error::Result;
use crate::stats::ArenaStats;
use parking_lot::Mutex;

/// Thread-safe size-classed slab allocator
///
/// ```
/// use slabmem::{SlabAllocator, SlabConfig};
///
/// let slabs = SlabAllocator::new(SlabConfig::default()).unwrap();
/// let id = slabs.classify(100);
/// assert_ne!(id, 0);
///
/// let chunk = slabs.allocate(100, id).unwrap();
/// slabs.with_chunk_mut(chunk, |buf| buf[0] = 42).unwrap();
/// slabs.free(chunk, 100, id);
/// ```
pub struct SlabAllocator {
    arena: Mutex<Arena>,
}

impl SlabAllocator {
    /// Initialize the allocator
    ///
    /// Fails on an invalid growth factor, a nonzero limit smaller than
    /// one page, or a factor so flat the class table would overflow.
    pub fn new(config: SlabConfig) -> Result<Self> {
        Ok(Self {
            arena: Mutex::new(Arena::new(&config)?),
        })
    }

    /// Class id serving `size`, or 0 when the size is unservable
    ///
    /// 0 is a reported condition, not a failure of the allocator; the
    /// caller decides how to store the oversized object.
    pub fn classify(&self, size: usize) -> usize {
        self.arena.lock().classify(size)
    }

    /// Allocate a chunk from class `id`; `None` means out of memory
    ///
    /// `id` must be a nonzero id previously returned by
    /// [`classify`](Self::classify) for a size no larger than `size`'s
    /// class.
    pub fn allocate(&self, size: usize, id: usize) -> Option<ChunkId> {
        self.arena.lock().allocate(size, id)
    }

    /// Return a chunk for LIFO reuse
    ///
    /// The (chunk, size, id) triple must match the allocation that
    /// produced it. Violations are not detected at runtime outside debug
    /// builds; this mirrors the original allocator contract.
    pub fn free(&self, chunk: ChunkId, size: usize, id: usize) {
        self.arena.lock().free(chunk, size, id);
    }

    /// Record that a tracked object's declared size changed
    pub fn adjust_requested(&self, id: usize, old: usize, new: usize) {
        self.arena.lock().adjust_requested(id, old, new);
    }

    /// Start draining one slab of class `id` for reclamation
    pub fn start_drain(&self, id: usize, slab: u32) -> Result<()> {
        self.arena.lock().begin_drain(id, slab)
    }

    /// Emit per-class and arena totals through the caller's stats sink
    ///
    /// The sink runs synchronously under the arena lock; transmitting the
    /// pairs anywhere is the host engine's concern.
    pub fn stats(&self, mut sink: impl FnMut(&str, &str)) {
        self.arena.lock().snapshot().emit(&mut sink);
    }

    /// Typed snapshot for in-process inspection
    pub fn snapshot(&self) -> ArenaStats {
        self.arena.lock().snapshot()
    }

    /// Run `f` over the chunk's backing bytes
    pub fn with_chunk<R>(&self, chunk: ChunkId, f: impl FnOnce(&[u8]) -> R) -> Option<R> {
        let arena = self.arena.lock();
        arena.chunk_bytes(chunk).map(f)
    }

    /// Run `f` over the chunk's backing bytes, mutably
    pub fn with_chunk_mut<R>(&self, chunk: ChunkId, f: impl FnOnce(&mut [u8]) -> R) -> Option<R> {
        let mut arena = self.arena.lock();
        arena.chunk_bytes_mut(chunk).map(f)
    }

    /// Bytes currently backing slabs
    pub fn mem_malloced(&self) -> usize {
        self.arena.lock().mem_malloced()
    }

    /// Remaining bytes of the preallocated region, 0 without prealloc
    pub fn mem_avail(&self) -> usize {
        self.arena.lock().mem_avail()
    }

    /// Id of the largest size class
    pub fn power_largest(&self) -> usize {
        self.arena.lock().power_largest()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn allocator() -> SlabAllocator {
        SlabAllocator::new(SlabConfig {
            page_size: 4096,
            min_chunk: 64,
            growth_factor: 2.0,
            ..SlabConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_classify_then_allocate() {
        let slabs = allocator();
        let id = slabs.classify(100);
        assert_ne!(id, 0);
        let chunk = slabs.allocate(100, id).unwrap();
        assert_eq!(chunk.class as usize, id);
    }

    #[test]
    fn test_oversize_sentinel() {
        let slabs = allocator();
        assert_eq!(slabs.classify(4097), 0);
    }

    #[test]
    fn test_invalid_config() {
        let err = SlabAllocator::new(SlabConfig {
            growth_factor: 0.9,
            ..SlabConfig::default()
        });
        assert!(matches!(err, Err(Error::InvalidGrowthFactor(_))));
    }

    #[test]
    fn test_with_chunk_round_trip() {
        let slabs = allocator();
        let id = slabs.classify(64);
        let chunk = slabs.allocate(64, id).unwrap();

        slabs
            .with_chunk_mut(chunk, |buf| buf[..4].copy_from_slice(b"item"))
            .unwrap();
        let head = slabs.with_chunk(chunk, |buf| buf[..4].to_vec()).unwrap();
        assert_eq!(head, b"item");
    }

    #[test]
    fn test_stats_sink_sees_totals() {
        let slabs = allocator();
        let id = slabs.classify(64);
        slabs.allocate(64, id).unwrap();
        slabs.adjust_requested(id, 0, 64);

        let mut pairs = Vec::new();
        slabs.stats(|k, v| pairs.push((k.to_string(), v.to_string())));

        assert!(pairs.contains(&(format!("{}:chunk_size", id), "64".into())));
        assert!(pairs.contains(&(format!("{}:mem_requested", id), "64".into())));
        assert!(pairs.contains(&("total_pages".into(), "1".into())));
    }

    #[test]
    fn test_concurrent_balanced_pairs() {
        use std::sync::Arc;

        let slabs = Arc::new(allocator());
        let id = slabs.classify(64);
        let baseline = {
            // Prime one page so every thread works the same class
            let chunk = slabs.allocate(64, id).unwrap();
            slabs.free(chunk, 64, id);
            slabs.mem_malloced()
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let slabs = Arc::clone(&slabs);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let chunk = slabs.allocate(64, id).expect("allocation");
                        slabs.with_chunk_mut(chunk, |buf| buf.fill(0x5A));
                        slabs.free(chunk, 64, id);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let stats = slabs.snapshot();
        let class = stats.classes.iter().find(|c| c.id == id).unwrap();
        assert_eq!(class.used_chunks, 0);
        // Balanced pairs leave the free list + end page covering the
        // whole class, same as the single-threaded trace
        assert_eq!(
            class.free_chunks as u64 + class.end_page_free as u64,
            class.total_pages as u64 * class.chunks_per_page as u64
        );
        // At most 8 chunks were ever live at once; one page covers that
        assert_eq!(slabs.mem_malloced(), baseline);
    }
}
