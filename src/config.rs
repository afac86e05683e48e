//! Mutable, lock-protected configuration for a [`crate::MemoryCache`].
//!
//! Every field here lives behind the same lock as the recency list and is
//! written and read alongside it, never on its own fast path. There is no
//! file or environment layer: these are runtime knobs on an in-process
//! object, not application configuration.

use std::sync::Arc;
use std::time::Duration;

/// A callback invoked outside the cache lock, before a conditional purge.
///
/// `Arc` rather than `Box` so the engine can clone the handle out from
/// under the lock before calling it, instead of holding the lock across an
/// arbitrary user callback.
pub type PurgeCallback = Arc<dyn Fn() + Send + Sync>;

/// Soft capacity bounds and background-worker policy for a cache.
///
/// `None` means "unbounded" for the three limits, matching `new()`'s
/// documented defaults.
pub struct CacheConfig {
    /// Soft limit on the number of entries.
    pub count_limit: Option<usize>,
    /// Soft limit on the sum of entry costs.
    pub cost_limit: Option<u64>,
    /// Soft limit on entry age before the sweeper evicts it.
    pub age_limit: Option<Duration>,
    /// Period between automatic sweeper wakeups.
    pub auto_trim_interval: Duration,
    /// Whether `on_memory_warning` triggers `remove_all`.
    pub remove_all_on_memory_warning: bool,
    /// Whether `on_enter_background` triggers `remove_all`.
    pub remove_all_on_enter_background: bool,
    /// Route evicted values to the main-thread queue instead of dropping
    /// them at the release site.
    pub release_on_main_thread: bool,
    /// Dispatch release to the rayon pool instead of dropping inline.
    pub release_asynchronously: bool,
    /// Caller-supplied label, for debugging only.
    pub name: Option<String>,
    /// Invoked outside the lock before a memory-warning-triggered purge.
    pub memory_warning_callback: Option<PurgeCallback>,
    /// Invoked outside the lock before a backgrounding-triggered purge.
    pub enter_background_callback: Option<PurgeCallback>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            count_limit: None,
            cost_limit: None,
            age_limit: None,
            auto_trim_interval: Duration::from_secs(5),
            remove_all_on_memory_warning: true,
            remove_all_on_enter_background: true,
            release_on_main_thread: false,
            release_asynchronously: true,
            name: None,
            memory_warning_callback: None,
            enter_background_callback: None,
        }
    }
}
