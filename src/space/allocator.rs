//! Live-position tracking for the streaming caller

/// Tracks positions held by the pileup
#[derive(Debug)]
pub struct SpaceTracker {
    /// Current positions held
    current: usize,

    /// Maximum seen
    max: usize,

    /// Profile data (if enabled)
    profile: Option<super::SpaceProfile>,
}

impl SpaceTracker {
    /// Create new tracker
    pub fn new(profile_enabled: bool) -> Self {
        Self {
            current: 0,
            max: 0,
            profile: profile_enabled.then(super::SpaceProfile::default),
        }
    }

    /// Record newly created positions
    pub fn allocate(&mut self, count: usize) {
        self.current += count;
        self.update_max();
    }

    /// Record an eviction batch
    pub fn free(&mut self, count: usize) {
        self.current = self.current.saturating_sub(count);

        if let Some(ref mut p) = self.profile {
            p.eviction_batches += 1;
            p.largest_batch = p.largest_batch.max(count);
            p.timeline.push((p.eviction_batches, self.current));
        }
    }

    fn update_max(&mut self) {
        self.max = self.max.max(self.current);

        if let Some(ref mut p) = self.profile {
            p.max_space = self.max;
        }
    }

    /// Positions currently held
    pub fn current(&self) -> usize {
        self.current
    }

    /// Get maximum positions held at once
    pub fn max_space_used(&self) -> usize {
        self.max
    }

    /// Take profile
    pub fn take_profile(&mut self) -> Option<super::SpaceProfile> {
        self.profile.take()
    }
}
