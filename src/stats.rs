//! Allocator statistics
//!
//! A typed snapshot for in-process use plus a key/value emitter for the
//! host engine's stats transport. The emitter prefixes per-class keys
//! with the class id ("3:chunk_size"), matching the reporting format
//! storage engines conventionally expose for slab allocators.

use serde::Serialize;

/// Statistics for one non-empty size class
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClassStats {
    /// 1-based class id
    pub id: usize,
    /// Chunk size in bytes
    pub chunk_size: usize,
    /// Chunks carved from one page
    pub chunks_per_page: u32,
    /// Pages currently backing the class
    pub total_pages: usize,
    /// Chunks handed out to callers
    pub used_chunks: u64,
    /// Free-list length
    pub free_chunks: usize,
    /// Sum of caller-declared sizes
    pub mem_requested: u64,
    /// Untouched chunks on the end page
    pub end_page_free: u32,
    /// Slab index currently draining, if any
    pub draining: Option<u32>,
}

/// Snapshot of the whole arena
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArenaStats {
    pub classes: Vec<ClassStats>,
    /// Classes that currently back at least one page
    pub active_classes: usize,
    /// Pages across all classes
    pub total_pages: usize,
    /// Bytes currently backing slabs
    pub total_malloced: usize,
    /// Configured ceiling, 0 = unbounded
    pub mem_limit: usize,
}

impl ArenaStats {
    /// Emit the snapshot as key/value pairs through the caller's sink
    pub fn emit(&self, sink: &mut dyn FnMut(&str, &str)) {
        for class in &self.classes {
            let mut pair = |key: &str, value: String| {
                sink(&format!("{}:{}", class.id, key), &value);
            };
            pair("chunk_size", class.chunk_size.to_string());
            pair("chunks_per_page", class.chunks_per_page.to_string());
            pair("total_pages", class.total_pages.to_string());
            pair("used_chunks", class.used_chunks.to_string());
            pair("free_chunks", class.free_chunks.to_string());
            pair("mem_requested", class.mem_requested.to_string());
            pair("end_page_free", class.end_page_free.to_string());
            if let Some(slab) = class.draining {
                pair("draining_slab", slab.to_string());
            }
        }
        sink("active_classes", &self.active_classes.to_string());
        sink("total_pages", &self.total_pages.to_string());
        sink("total_malloced", &self.total_malloced.to_string());
        sink("mem_limit", &self.mem_limit.to_string());
    }
}
