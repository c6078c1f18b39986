//! Slab pages
//!
//! A slab is one contiguous page carved into equal-size chunks for a
//! single size class. The backing memory either belongs to the slab
//! itself (incremental mode) or is a carved range of the arena's
//! preallocated region.

use std::ops::Range;

/// Backing memory of one slab page
#[derive(Debug)]
pub enum PageMemory {
    /// Heap block owned by the slab, obtained when the class grew
    Owned(Box<[u8]>),
    /// Byte offset into the arena's preallocated region
    Carved { offset: usize },
}

/// One page of memory belonging to a size class
#[derive(Debug)]
pub struct Slab {
    memory: PageMemory,
    chunk_size: usize,
    chunk_count: u32,
}

impl Slab {
    /// Wrap a page for a class with the given chunk geometry
    pub fn new(memory: PageMemory, chunk_size: usize, chunk_count: u32) -> Self {
        Self {
            memory,
            chunk_size,
            chunk_count,
        }
    }

    /// Number of chunks carved from this page
    pub fn chunk_count(&self) -> u32 {
        self.chunk_count
    }

    /// Byte range of a chunk within the page, or `None` if out of bounds
    pub fn chunk_span(&self, chunk: u32) -> Option<Range<usize>> {
        if chunk >= self.chunk_count {
            return None;
        }
        let start = chunk as usize * self.chunk_size;
        Some(start..start + self.chunk_size)
    }

    pub fn memory(&self) -> &PageMemory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut PageMemory {
        &mut self.memory
    }

    /// Take the backing page out, consuming the slab
    pub fn into_memory(self) -> PageMemory {
        self.memory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owned_slab(chunk_size: usize, count: u32) -> Slab {
        let block = vec![0u8; chunk_size * count as usize].into_boxed_slice();
        Slab::new(PageMemory::Owned(block), chunk_size, count)
    }

    #[test]
    fn test_chunk_span() {
        let slab = owned_slab(64, 4);
        assert_eq!(slab.chunk_span(0), Some(0..64));
        assert_eq!(slab.chunk_span(3), Some(192..256));
        assert_eq!(slab.chunk_span(4), None);
    }

    #[test]
    fn test_carved_span_is_page_relative() {
        let slab = Slab::new(PageMemory::Carved { offset: 4096 }, 128, 8);
        // Spans are relative to the page; the arena adds the carve offset
        assert_eq!(slab.chunk_span(1), Some(128..256));
    }

    #[test]
    fn test_into_memory() {
        let slab = owned_slab(32, 2);
        match slab.into_memory() {
            PageMemory::Owned(block) => assert_eq!(block.len(), 64),
            PageMemory::Carved { .. } => panic!("expected owned page"),
        }
    }
}
