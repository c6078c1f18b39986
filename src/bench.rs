//! Timing smoke tests for the allocation fast paths

#[cfg(test)]
mod bench {
    use crate::{SlabAllocator, SlabConfig};
    use std::time::Instant;

    /// Benchmark free-list reuse against bump allocation
    #[test]
    fn bench_reuse_vs_bump() {
        let slabs = SlabAllocator::new(SlabConfig::default()).unwrap();
        let id = slabs.classify(128);

        // Bump path: fresh chunks off the end page
        let start = Instant::now();
        let chunks: Vec<_> = (0..10_000)
            .map(|_| slabs.allocate(128, id).unwrap())
            .collect();
        let bump_elapsed = start.elapsed();
        println!("bump path: {:?} for 10k allocations", bump_elapsed);

        for chunk in &chunks {
            slabs.free(*chunk, 128, id);
        }

        // Reuse path: everything comes off the free list
        let start = Instant::now();
        for _ in 0..10_000 {
            let chunk = slabs.allocate(128, id).unwrap();
            slabs.free(chunk, 128, id);
        }
        let reuse_elapsed = start.elapsed();
        println!("reuse path: {:?} for 10k alloc/free pairs", reuse_elapsed);

        // No page growth happened during the reuse loop
        let pages = slabs.snapshot().total_pages;
        for _ in 0..1000 {
            let chunk = slabs.allocate(128, id).unwrap();
            slabs.free(chunk, 128, id);
        }
        assert_eq!(slabs.snapshot().total_pages, pages);
    }

    /// Benchmark classify lookups across the whole table
    #[test]
    fn bench_classify_lookup() {
        let slabs = SlabAllocator::new(SlabConfig::default()).unwrap();

        let start = Instant::now();
        let mut acc = 0usize;
        for size in (1..100_000).step_by(37) {
            acc = acc.wrapping_add(slabs.classify(size));
        }
        let elapsed = start.elapsed();
        println!("classify: {:?} for ~2.7k lookups (acc={})", elapsed, acc);
        assert!(acc > 0);
    }
}
