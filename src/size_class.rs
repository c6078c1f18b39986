//! Size class table for the slab allocator
//!
//! Derives the set of chunk sizes from a growth factor: each class's
//! chunk size is the previous one times the factor, rounded up for
//! alignment, until a chunk would no longer fit twice in a page. A final
//! class of exactly one page caps the table. The table is immutable once
//! built.

use crate::config::{align_chunk, SlabConfig};
use crate::error::{Error, Result};

/// Hard cap on the number of size classes
pub const MAX_CLASSES: usize = 200;

/// Sentinel class id meaning "no class can serve this size"
pub const CLASS_NONE: usize = 0;

/// One entry of the size class table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeClass {
    /// Chunk size in bytes
    pub size: usize,
    /// Chunks carved from one page
    pub items_per_slab: u32,
}

/// Ordered, immutable table of size classes
///
/// Class ids are 1-based; id 0 is reserved as the "unservable size"
/// sentinel returned by [`classify`](SizeClassTable::classify).
#[derive(Debug)]
pub struct SizeClassTable {
    classes: Vec<SizeClass>,
    page_size: usize,
}

impl SizeClassTable {
    /// Build the table for the given configuration
    ///
    /// Fails if the growth factor is not > 1.0 or if the factor is so
    /// close to 1.0 that the class count would exceed [`MAX_CLASSES`].
    pub fn build(config: &SlabConfig) -> Result<Self> {
        if config.growth_factor <= 1.0 {
            return Err(Error::InvalidGrowthFactor(config.growth_factor));
        }

        let page_size = config.page_size;
        let mut classes = Vec::new();
        let mut size = align_chunk(config.min_chunk.max(1));

        while (size as f64) * config.growth_factor <= page_size as f64 {
            if classes.len() >= MAX_CLASSES - 1 {
                return Err(Error::TooManyClasses(classes.len() + 1, MAX_CLASSES));
            }
            classes.push(SizeClass {
                size,
                items_per_slab: (page_size / size) as u32,
            });

            let next = align_chunk((size as f64 * config.growth_factor).ceil() as usize);
            // Alignment rounding must never stall the progression
            size = next.max(size + crate::config::CHUNK_ALIGN);
        }

        // The largest class is a whole page
        classes.push(SizeClass {
            size: page_size,
            items_per_slab: 1,
        });

        Ok(Self { classes, page_size })
    }

    /// Smallest class id whose chunk size is >= `size`
    ///
    /// Returns [`CLASS_NONE`] when `size` exceeds the largest chunk size;
    /// the object is too large for the allocator to serve.
    pub fn classify(&self, size: usize) -> usize {
        let idx = self.classes.partition_point(|c| c.size < size);
        if idx == self.classes.len() {
            CLASS_NONE
        } else {
            idx + 1
        }
    }

    /// Entry for a 1-based class id
    pub fn class(&self, id: usize) -> Option<&SizeClass> {
        self.classes.get(id.checked_sub(1)?)
    }

    /// Id of the last (largest) class
    pub fn power_largest(&self) -> usize {
        self.classes.len()
    }

    /// Chunk size of the largest class
    pub fn largest_chunk(&self) -> usize {
        self.page_size
    }

    /// Iterate entries together with their 1-based ids
    pub fn iter(&self) -> impl Iterator<Item = (usize, &SizeClass)> {
        self.classes.iter().enumerate().map(|(i, c)| (i + 1, c))
    }
}
