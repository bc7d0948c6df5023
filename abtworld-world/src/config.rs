use std::num::NonZeroUsize;
use std::time::Duration;

/// Tuning knobs shared by the file and network worlds.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Maximum number of entries in the recently-used cache. `None` keeps
    /// every touched chunk cached. The resident chunk list is never bounded.
    pub cache_capacity: Option<NonZeroUsize>,
    /// How long the network world's delivery loop waits before re-checking
    /// its stop flag.
    pub poll_interval: Duration,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cache_capacity: NonZeroUsize::new(256),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl WorldConfig {
    pub fn with_cache_capacity(mut self, capacity: Option<NonZeroUsize>) -> Self {
        self.cache_capacity = capacity;
        self
    }
}
