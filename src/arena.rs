//! The arena: top-level owner of all size classes and their memory
//!
//! Grows one page at a time, either from the system (incremental mode,
//! subject to `mem_limit`) or by carving the preallocated region. Pages
//! reclaimed by the drain path are pooled and reused before any new page
//! is obtained.

use crate::chunk::ChunkId;
use crate::class::{DrainState, FreeOutcome, SlabClass};
use crate::config::SlabConfig;
use crate::error::{Error, Result};
use crate::size_class::SizeClassTable;
use crate::slab::{PageMemory, Slab};
use crate::stats::{ArenaStats, ClassStats};
use tracing::{debug, info, warn};

/// Single up-front memory reservation for prealloc mode
struct Region {
    base: Box<[u8]>,
    cursor: usize,
}

impl Region {
    fn new(len: usize) -> Self {
        Self {
            base: vec![0u8; len].into_boxed_slice(),
            cursor: 0,
        }
    }

    fn avail(&self) -> usize {
        self.base.len() - self.cursor
    }

    fn carve(&mut self, len: usize) -> Option<usize> {
        if self.avail() < len {
            return None;
        }
        let offset = self.cursor;
        self.cursor += len;
        Some(offset)
    }
}

/// Owns the size class table, all slab classes, and the memory budget
pub struct Arena {
    table: SizeClassTable,
    classes: Vec<SlabClass>,
    page_size: usize,
    mem_limit: usize,
    /// Bytes currently backing slabs
    mem_malloced: usize,
    region: Option<Region>,
    /// Region offsets of reclaimed pages, reused before carving
    free_pages: Vec<usize>,
}

impl Arena {
    /// Build an arena for the given configuration
    pub fn new(config: &SlabConfig) -> Result<Self> {
        if config.mem_limit != 0 && config.mem_limit < config.page_size {
            return Err(Error::LimitTooSmall {
                limit: config.mem_limit,
                page: config.page_size,
            });
        }
        let table = SizeClassTable::build(config)?;

        let classes: Vec<SlabClass> = table
            .iter()
            .map(|(id, c)| SlabClass::new(id as u16, c.size, c.items_per_slab))
            .collect();

        let region = if config.prealloc {
            let bytes = config.prealloc_bytes();
            info!(bytes, "preallocating slab region");
            Some(Region::new(bytes))
        } else {
            None
        };

        info!(
            classes = table.power_largest(),
            page_size = config.page_size,
            mem_limit = config.mem_limit,
            prealloc = config.prealloc,
            "slab arena initialized"
        );

        Ok(Self {
            table,
            classes,
            page_size: config.page_size,
            mem_limit: config.mem_limit,
            mem_malloced: 0,
            region,
            free_pages: Vec::new(),
        })
    }

    /// Smallest class able to serve `size`, 0 when none can
    pub fn classify(&self, size: usize) -> usize {
        self.table.classify(size)
    }

    /// Allocate one chunk from class `id`
    ///
    /// `size` is informational; accounting happens through
    /// [`adjust_requested`](Self::adjust_requested). `id` must come from
    /// [`classify`](Self::classify) and be nonzero.
    pub fn allocate(&mut self, size: usize, id: usize) -> Option<ChunkId> {
        let _ = size;
        let idx = id.checked_sub(1)?;
        if idx >= self.classes.len() {
            debug_assert!(false, "allocate called with unknown class id {}", id);
            return None;
        }

        if let Some(chunk) = self.classes[idx].pop_free() {
            return Some(chunk);
        }
        if let Some(chunk) = self.classes[idx].bump() {
            return Some(chunk);
        }

        let memory = self.obtain_page(id)?;
        self.mem_malloced += self.page_size;
        let class = &mut self.classes[idx];
        let slab = Slab::new(memory, class.chunk_size(), class.items_per_slab());
        class.install_page(slab);
        self.classes[idx].bump()
    }

    /// Return a chunk to its class
    ///
    /// The (chunk, size, id) triple must match the earlier allocation;
    /// that is the caller's contract and only debug assertions check it.
    pub fn free(&mut self, chunk: ChunkId, size: usize, id: usize) {
        let _ = size;
        debug_assert_eq!(chunk.class as usize, id, "free with mismatched class id");
        let Some(idx) = id.checked_sub(1) else { return };
        if idx >= self.classes.len() {
            debug_assert!(false, "free called with unknown class id {}", id);
            return;
        }

        match self.classes[idx].note_free(chunk) {
            FreeOutcome::Recycled | FreeOutcome::Draining => {}
            FreeOutcome::Reclaim(slab) => self.reclaim(idx, slab),
        }
    }

    /// Fold a caller-side object resize into the class accounting
    pub fn adjust_requested(&mut self, id: usize, old: usize, new: usize) {
        let Some(idx) = id.checked_sub(1) else { return };
        if let Some(class) = self.classes.get_mut(idx) {
            class.adjust_requested(old, new);
        }
    }

    /// Start draining one slab of class `id`
    ///
    /// Reclaims immediately when no chunk of the slab is outstanding.
    pub fn begin_drain(&mut self, id: usize, slab: u32) -> Result<()> {
        let idx = id
            .checked_sub(1)
            .filter(|i| *i < self.classes.len())
            .ok_or(Error::UnknownClass(id))?;
        let outstanding = self.classes[idx].begin_drain(slab)?;
        if outstanding == 0 {
            self.reclaim(idx, slab);
        }
        Ok(())
    }

    fn reclaim(&mut self, idx: usize, slab: u32) {
        let Some(page) = self.classes[idx].take_slab(slab) else {
            return;
        };
        self.mem_malloced -= self.page_size;
        match page.into_memory() {
            // Dropping the block hands it back to the system
            PageMemory::Owned(_) => {}
            PageMemory::Carved { offset } => self.free_pages.push(offset),
        }
        info!(class = idx + 1, slab, "slab reclaimed");
    }

    fn obtain_page(&mut self, id: usize) -> Option<PageMemory> {
        if let Some(offset) = self.free_pages.pop() {
            debug!(class = id, offset, "reusing reclaimed page");
            return Some(PageMemory::Carved { offset });
        }
        match &mut self.region {
            Some(region) => match region.carve(self.page_size) {
                Some(offset) => {
                    debug!(class = id, offset, "carved page from region");
                    Some(PageMemory::Carved { offset })
                }
                None => {
                    warn!(
                        class = id,
                        avail = region.avail(),
                        page_size = self.page_size,
                        "preallocated region exhausted"
                    );
                    None
                }
            },
            None => {
                if self.mem_limit != 0 && self.mem_malloced + self.page_size > self.mem_limit {
                    warn!(
                        class = id,
                        mem_malloced = self.mem_malloced,
                        mem_limit = self.mem_limit,
                        "memory limit reached"
                    );
                    return None;
                }
                debug!(class = id, page_size = self.page_size, "allocated page");
                Some(PageMemory::Owned(
                    vec![0u8; self.page_size].into_boxed_slice(),
                ))
            }
        }
    }

    /// Borrow the bytes backing a chunk
    pub fn chunk_bytes(&self, chunk: ChunkId) -> Option<&[u8]> {
        let class = self.classes.get((chunk.class as usize).checked_sub(1)?)?;
        let slab = class.slab(chunk.slab)?;
        let span = slab.chunk_span(chunk.chunk)?;
        match slab.memory() {
            PageMemory::Owned(block) => block.get(span),
            PageMemory::Carved { offset } => {
                let base = &self.region.as_ref()?.base;
                base.get(offset + span.start..offset + span.end)
            }
        }
    }

    /// Mutably borrow the bytes backing a chunk
    pub fn chunk_bytes_mut(&mut self, chunk: ChunkId) -> Option<&mut [u8]> {
        let idx = (chunk.class as usize).checked_sub(1)?;
        let (carve_offset, span) = {
            let class = self.classes.get(idx)?;
            let slab = class.slab(chunk.slab)?;
            let span = slab.chunk_span(chunk.chunk)?;
            match slab.memory() {
                PageMemory::Owned(_) => (None, span),
                PageMemory::Carved { offset } => (Some(*offset), span),
            }
        };
        match carve_offset {
            Some(offset) => {
                let base = &mut self.region.as_mut()?.base;
                base.get_mut(offset + span.start..offset + span.end)
            }
            None => match self.classes[idx].slab_mut(chunk.slab)?.memory_mut() {
                PageMemory::Owned(block) => block.get_mut(span),
                PageMemory::Carved { .. } => None,
            },
        }
    }

    pub fn mem_malloced(&self) -> usize {
        self.mem_malloced
    }

    pub fn mem_limit(&self) -> usize {
        self.mem_limit
    }

    /// Remaining bytes of the preallocated region, 0 without prealloc
    pub fn mem_avail(&self) -> usize {
        self.region.as_ref().map_or(0, Region::avail)
    }

    pub fn power_largest(&self) -> usize {
        self.table.power_largest()
    }

    /// Snapshot of every class currently backing at least one page
    pub fn snapshot(&self) -> ArenaStats {
        let classes: Vec<ClassStats> = self
            .classes
            .iter()
            .enumerate()
            .filter(|(_, class)| class.page_count() > 0)
            .map(|(idx, class)| ClassStats {
                id: idx + 1,
                chunk_size: class.chunk_size(),
                chunks_per_page: class.items_per_slab(),
                total_pages: class.page_count(),
                used_chunks: class.used_chunks(),
                free_chunks: class.free_len(),
                mem_requested: class.requested(),
                end_page_free: class.end_page_free(),
                draining: match class.drain_state() {
                    DrainState::Stable => None,
                    DrainState::Draining { slab, .. } => Some(slab),
                },
            })
            .collect();

        ArenaStats {
            active_classes: classes.len(),
            total_pages: classes.iter().map(|c| c.total_pages).sum(),
            total_malloced: self.mem_malloced,
            mem_limit: self.mem_limit,
            classes,
        }
    }
}
