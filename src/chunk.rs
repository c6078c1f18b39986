//! Chunk handles for the slab allocator

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque handle to one allocated chunk
///
/// Replaces the raw pointers of classic slab allocators with an index
/// triple into the arena, so a stale handle can dangle logically but
/// never reference freed process memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChunkId {
    /// 1-based size class id
    pub class: u16,
    /// Slab index within the class
    pub slab: u32,
    /// Chunk index within the slab
    pub chunk: u32,
}

impl ChunkId {
    /// Create a new chunk handle
    pub fn new(class: u16, slab: u32, chunk: u32) -> Self {
        Self { class, slab, chunk }
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Chunk(class={}, slab={}, chunk={})",
            self.class, self.slab, self.chunk
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_id_creation() {
        let id = ChunkId::new(3, 1, 42);
        assert_eq!(id.class, 3);
        assert_eq!(id.slab, 1);
        assert_eq!(id.chunk, 42);
    }

    #[test]
    fn test_display() {
        let id = ChunkId::new(2, 0, 7);
        assert_eq!(id.to_string(), "Chunk(class=2, slab=0, chunk=7)");
    }

    #[test]
    fn test_serde_round_trip() {
        let id = ChunkId::new(5, 2, 13);
        let json = serde_json::to_string(&id).unwrap();
        let back: ChunkId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
