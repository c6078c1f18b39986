//! Per-size-class slab management
//!
//! A `SlabClass` owns the pages serving one chunk size: a LIFO free list
//! of recycled chunks, a bump cursor over the most recently installed
//! page, and the drain state machine that lets the arena take a page
//! back once every chunk on it has been returned.

use crate::chunk::ChunkId;
use crate::error::{Error, Result};
use crate::slab::Slab;
use tracing::debug;

/// Drain progress for one class
///
/// At most one slab drains at a time. While draining, the slab is never
/// bump-allocated from and returned chunks bypass the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    Stable,
    Draining { slab: u32, outstanding: u32 },
}

/// What a returned chunk became
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    /// Pushed onto the free list for LIFO reuse
    Recycled,
    /// Counted against the draining slab, more chunks still out
    Draining,
    /// Last outstanding chunk came back; the slab can be reclaimed
    Reclaim(u32),
}

/// Bump-allocation cursor into the newest page
#[derive(Debug, Clone, Copy)]
struct EndPage {
    slab: u32,
    next_chunk: u32,
    remaining: u32,
}

/// All slabs, free chunks, and accounting for one size class
#[derive(Debug)]
pub struct SlabClass {
    id: u16,
    chunk_size: usize,
    items_per_slab: u32,
    /// Reclaimed entries become `None`; indices stay stable
    slabs: Vec<Option<Slab>>,
    /// LIFO free list: most recently freed chunk is reused first
    free: Vec<ChunkId>,
    end_page: Option<EndPage>,
    /// Chunks currently handed out to callers
    used: u64,
    /// Sum of caller-declared sizes, accounting only
    requested: u64,
    drain: DrainState,
}

impl SlabClass {
    pub fn new(id: u16, chunk_size: usize, items_per_slab: u32) -> Self {
        Self {
            id,
            chunk_size,
            items_per_slab,
            slabs: Vec::new(),
            free: Vec::new(),
            end_page: None,
            used: 0,
            requested: 0,
            drain: DrainState::Stable,
        }
    }

    /// Reuse the most recently freed chunk, if any
    pub fn pop_free(&mut self) -> Option<ChunkId> {
        let chunk = self.free.pop()?;
        self.used += 1;
        Some(chunk)
    }

    /// Hand out the next untouched chunk of the end page, if any
    pub fn bump(&mut self) -> Option<ChunkId> {
        let cursor = self.end_page.as_mut()?;
        if cursor.remaining == 0 {
            return None;
        }
        let chunk = ChunkId::new(self.id, cursor.slab, cursor.next_chunk);
        cursor.next_chunk += 1;
        cursor.remaining -= 1;
        self.used += 1;
        Some(chunk)
    }

    /// Install a freshly obtained page as the new end page
    pub fn install_page(&mut self, slab: Slab) -> u32 {
        // The arena only grows once the current end page is exhausted
        debug_assert_eq!(self.end_page_free(), 0, "end page abandoned with free chunks");
        let chunk_count = slab.chunk_count();
        // Reclaimed slots are reused so slab indices stay small
        let index = match self.slabs.iter().position(|s| s.is_none()) {
            Some(i) => {
                self.slabs[i] = Some(slab);
                i as u32
            }
            None => {
                self.slabs.push(Some(slab));
                (self.slabs.len() - 1) as u32
            }
        };
        self.end_page = Some(EndPage {
            slab: index,
            next_chunk: 0,
            remaining: chunk_count,
        });
        debug!(class = self.id, slab = index, chunks = chunk_count, "installed page");
        index
    }

    /// Accept a chunk back from the caller
    ///
    /// The (chunk, class) pairing is the caller's contract; it is only
    /// checked by debug assertions.
    pub fn note_free(&mut self, chunk: ChunkId) -> FreeOutcome {
        debug_assert_eq!(chunk.class, self.id, "chunk freed to the wrong class");
        debug_assert!(
            (chunk.slab as usize) < self.slabs.len()
                && self.slabs[chunk.slab as usize].is_some(),
            "chunk freed to a reclaimed slab"
        );
        self.used = self.used.saturating_sub(1);

        if let DrainState::Draining { slab, outstanding } = self.drain {
            if chunk.slab == slab {
                let outstanding = outstanding - 1;
                if outstanding == 0 {
                    self.drain = DrainState::Stable;
                    return FreeOutcome::Reclaim(slab);
                }
                self.drain = DrainState::Draining { slab, outstanding };
                return FreeOutcome::Draining;
            }
        }

        self.free.push(chunk);
        FreeOutcome::Recycled
    }

    /// Mark one slab as draining
    ///
    /// Strips the slab's chunks from the free list and the bump cursor,
    /// then waits for the remaining chunks to come back. Returns the
    /// number still outstanding; zero means the slab is reclaimable
    /// immediately and the state stays `Stable`.
    pub fn begin_drain(&mut self, slab: u32) -> Result<u32> {
        if let DrainState::Draining { slab: current, .. } = self.drain {
            return Err(Error::AlreadyDraining {
                class: self.id as usize,
                slab: current,
            });
        }
        let total = match self.slabs.get(slab as usize) {
            Some(Some(s)) => s.chunk_count(),
            _ => {
                return Err(Error::UnknownSlab {
                    class: self.id as usize,
                    slab,
                })
            }
        };

        let before = self.free.len();
        self.free.retain(|c| c.slab != slab);
        let recycled = (before - self.free.len()) as u32;

        let untouched = match self.end_page {
            Some(cursor) if cursor.slab == slab => {
                self.end_page = None;
                cursor.remaining
            }
            _ => 0,
        };

        let outstanding = total - recycled - untouched;
        debug!(
            class = self.id,
            slab,
            outstanding,
            recycled,
            untouched,
            "drain started"
        );
        if outstanding > 0 {
            self.drain = DrainState::Draining { slab, outstanding };
        }
        Ok(outstanding)
    }

    /// Remove a fully drained slab, yielding its page to the arena
    pub fn take_slab(&mut self, slab: u32) -> Option<Slab> {
        self.slabs.get_mut(slab as usize)?.take()
    }

    /// Fold a caller-side size change into the requested counter
    pub fn adjust_requested(&mut self, old: usize, new: usize) {
        self.requested = self
            .requested
            .saturating_sub(old as u64)
            .saturating_add(new as u64);
    }

    pub fn slab(&self, slab: u32) -> Option<&Slab> {
        self.slabs.get(slab as usize)?.as_ref()
    }

    pub fn slab_mut(&mut self, slab: u32) -> Option<&mut Slab> {
        self.slabs.get_mut(slab as usize)?.as_mut()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn items_per_slab(&self) -> u32 {
        self.items_per_slab
    }

    /// Pages currently backing this class
    pub fn page_count(&self) -> usize {
        self.slabs.iter().filter(|s| s.is_some()).count()
    }

    pub fn free_len(&self) -> usize {
        self.free.len()
    }

    pub fn used_chunks(&self) -> u64 {
        self.used
    }

    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn end_page_free(&self) -> u32 {
        self.end_page.map_or(0, |c| c.remaining)
    }

    pub fn drain_state(&self) -> DrainState {
        self.drain
    }
}
