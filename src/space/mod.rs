//! Live-position accounting
//!
//! Tracks how many pileup positions are held at once, so callers can verify
//! that memory follows the retention window and not the stream length.

mod allocator;

pub use allocator::SpaceTracker;

/// Detailed space profile (if enabled)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpaceProfile {
    /// Maximum live positions
    pub max_space: usize,

    /// Number of eviction batches
    pub eviction_batches: usize,

    /// Largest single eviction batch
    pub largest_batch: usize,

    /// Live positions sampled after each eviction batch: (batch, live)
    pub timeline: Vec<(usize, usize)>,
}

impl SpaceProfile {
    /// Verify bound is satisfied
    pub fn satisfies_bound(&self, bound: usize) -> bool {
        self.max_space <= bound
    }

    /// Generate report
    pub fn report(&self) -> String {
        format!(
            "Max live positions: {}\nEvictions:\n  Batches: {}\n  Largest: {}",
            self.max_space, self.eviction_batches, self.largest_batch
        )
    }
}
