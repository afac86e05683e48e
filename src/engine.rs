//! The published cache contract: the single mutex-guarded engine that sits
//! on top of the [`crate::recency_list::RecencyList`] and routes evictions
//! to the trim scheduler and release path.

use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::recency_list::RecencyList;
use crate::release::{self, MainThreadQueue};
use crate::trim::{self, TrimCommand};

/// Everything the cache lock protects: the recency list and the mutable
/// configuration fields. Config reads and writes happen under the same
/// lock as every other cache operation; there is no separate fast path.
pub(crate) struct State<K, V> {
    pub(crate) list: RecencyList<K, V>,
    pub(crate) config: CacheConfig,
}

/// Shared engine state. Held by `MemoryCache` via `Arc` and by the
/// background sweeper via `Weak`, so the sweeper never keeps the cache
/// alive on its own.
pub(crate) struct Inner<K, V> {
    pub(crate) state: Mutex<State<K, V>>,
    pub(crate) main_queue: MainThreadQueue,
    pub(crate) trim_tx: Sender<TrimCommand>,
}

/// A thread-safe, in-process LRU cache bounded by entry count, aggregate
/// cost, and entry age.
///
/// Keys are compared and hashed by value (`K: Hash + Eq + Clone`); values
/// must be `Clone` since `get` hands back an owned copy while the cache
/// retains the original (wrap expensive payloads in `Arc<T>` if cloning the
/// value itself is undesirable).
pub struct MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    inner: Arc<Inner<K, V>>,
}

impl<K, V> MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    /// Constructs a cache with the defaults documented on [`CacheConfig`]:
    /// all limits unbounded, a 5 second sweeper interval, and both purge
    /// policies enabled.
    ///
    /// # Panics
    ///
    /// Panics if the background trim-dispatch or sweeper threads cannot be
    /// spawned. A cache that cannot start its background workers has
    /// degenerated to no-cache semantics anyway: better to fail loudly at
    /// construction than limp along silently unbounded.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default()).expect("failed to start cache background workers")
    }

    /// Constructs a cache with explicit configuration. Fallible because
    /// spawning background threads can fail under resource exhaustion;
    /// [`Self::new`] unwraps this for the common case.
    pub fn with_config(config: CacheConfig) -> Result<Self> {
        let auto_trim_interval = config.auto_trim_interval;
        let (trim_tx, trim_rx) = crossbeam_channel::unbounded();

        let inner = Arc::new(Inner {
            state: Mutex::new(State {
                list: RecencyList::new(),
                config,
            }),
            main_queue: MainThreadQueue::new(),
            trim_tx,
        });

        trim::spawn_trim_worker(Arc::clone(&inner), trim_rx).map_err(Error::TrimWorkerSpawn)?;
        trim::spawn_sweeper(Arc::downgrade(&inner), auto_trim_interval)
            .map_err(Error::SweeperSpawn)?;

        Ok(Self { inner })
    }

    /// Returns whether `key` is present. A cache with no per-key identity
    /// to check (there is no such thing as a null `K` once the type system
    /// is involved) simply reports the lookup result.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.inner.state.lock().list.handle_for(key).is_some()
    }

    /// Looks up `key`, refreshing its recency on a hit. Mutates recency
    /// order even though it is a "read."
    pub fn get(&self, key: &K) -> Option<V> {
        let mut state = self.inner.state.lock();
        let handle = state.list.handle_for(key)?;
        state.list.mark_read(handle, Instant::now());
        Some(state.list.get_value(handle).clone())
    }

    /// Inserts or replaces `key` with `value` at cost 0. See
    /// [`Self::put_with_cost`] for the full contract.
    pub fn put(&self, key: K, value: V) {
        self.put_with_cost(key, value, 0);
    }

    /// Inserts or replaces `key` with `value`, tracked at `cost` for the
    /// cost bound. Replacing an existing key adjusts `total_cost` by the
    /// delta (`new_cost - old_cost`), not by adding `new_cost` again.
    ///
    /// A single `put` can only overshoot either bound by one entry's worth
    /// when the limit was in force and respected beforehand, but
    /// `count_limit`/`cost_limit` are mutable at runtime (see
    /// [`Self::set_count_limit`]/[`Self::set_cost_limit`]), so an arbitrary
    /// overshoot is always possible here. Neither bound is enforced
    /// synchronously on this thread: both are handed to the serial trim
    /// queue, which reconciles whatever overshoot it finds.
    pub fn put_with_cost(&self, key: K, value: V, cost: u64) {
        let should_schedule_count_trim;
        let should_schedule_cost_trim;
        {
            let mut state = self.inner.state.lock();
            let now = Instant::now();
            match state.list.handle_for(&key) {
                Some(handle) => {
                    state.list.touch(handle, value, cost, now);
                }
                None => {
                    state.list.insert_at_head(key, value, cost, now);
                }
            }

            should_schedule_count_trim = state
                .config
                .count_limit
                .is_some_and(|limit| state.list.total_count() > limit);
            should_schedule_cost_trim = state
                .config
                .cost_limit
                .is_some_and(|limit| state.list.total_cost() > limit);
        }

        // Best-effort: if the channel is somehow disconnected the sweeper
        // will still catch the overshoot on its next wakeup.
        if should_schedule_count_trim {
            let _ = self.inner.trim_tx.send(TrimCommand::Count);
        }
        if should_schedule_cost_trim {
            let _ = self.inner.trim_tx.send(TrimCommand::Cost);
        }
    }

    /// Removes `key` if present, routing its value to the release path.
    pub fn remove(&self, key: &K) {
        let value = {
            let mut state = self.inner.state.lock();
            state
                .list
                .handle_for(key)
                .map(|handle| state.list.remove(handle))
        };
        if let Some(value) = value {
            let (on_main, async_) = self.release_policy();
            release::release(value, on_main, async_, &self.inner.main_queue);
        }
    }

    /// Empties the cache, routing every retained value to the release path
    /// as a single batch.
    pub fn remove_all(&self) {
        let contents = self.inner.state.lock().list.clear();
        let (on_main, async_) = self.release_policy();
        release::release(contents, on_main, async_, &self.inner.main_queue);
    }

    /// Synchronously trims down to `n` entries. `n == 0` is equivalent to
    /// [`Self::remove_all`].
    pub fn trim_to_count(&self, n: usize) {
        if n == 0 {
            self.remove_all();
            return;
        }
        trim::run(&self.inner, move |list| list.total_count() > n);
    }

    /// Synchronously trims down to a total cost of `c`. `c == 0` is
    /// equivalent to [`Self::remove_all`].
    pub fn trim_to_cost(&self, c: u64) {
        if c == 0 {
            self.remove_all();
            return;
        }
        trim::run(&self.inner, move |list| list.total_cost() > c);
    }

    /// Synchronously evicts every entry whose age exceeds `max_age`.
    pub fn trim_to_age(&self, max_age: Duration) {
        trim::run(&self.inner, move |list| {
            list.tail_last_access()
                .is_some_and(|ts| ts.elapsed() > max_age)
        });
    }

    /// Current entry count. A consistent snapshot with [`Self::total_cost`]
    /// only if read under the same lock acquisition; callers needing both
    /// atomically should prefer reading them back-to-back, which is still
    /// subject to interleaving from other threads between the two calls.
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.inner.state.lock().list.total_count()
    }

    /// Current aggregate cost.
    #[must_use]
    pub fn total_cost(&self) -> u64 {
        self.inner.state.lock().list.total_cost()
    }

    /// Current soft entry-count limit.
    #[must_use]
    pub fn count_limit(&self) -> Option<usize> {
        self.inner.state.lock().config.count_limit
    }

    /// Replaces the soft entry-count limit.
    pub fn set_count_limit(&self, limit: Option<usize>) {
        self.inner.state.lock().config.count_limit = limit;
    }

    /// Current soft aggregate-cost limit.
    #[must_use]
    pub fn cost_limit(&self) -> Option<u64> {
        self.inner.state.lock().config.cost_limit
    }

    /// Replaces the soft aggregate-cost limit.
    pub fn set_cost_limit(&self, limit: Option<u64>) {
        self.inner.state.lock().config.cost_limit = limit;
    }

    /// Current soft age limit.
    #[must_use]
    pub fn age_limit(&self) -> Option<Duration> {
        self.inner.state.lock().config.age_limit
    }

    /// Replaces the soft age limit.
    pub fn set_age_limit(&self, limit: Option<Duration>) {
        self.inner.state.lock().config.age_limit = limit;
    }

    /// Current sweeper wakeup period.
    #[must_use]
    pub fn auto_trim_interval(&self) -> Duration {
        self.inner.state.lock().config.auto_trim_interval
    }

    /// Replaces the sweeper's wakeup period. Takes effect on the sweeper's
    /// next wakeup, not immediately.
    pub fn set_auto_trim_interval(&self, interval: Duration) {
        self.inner.state.lock().config.auto_trim_interval = interval;
    }

    /// Caller-supplied label, for debugging only.
    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.inner.state.lock().config.name.clone()
    }

    /// Replaces the caller-supplied debug label.
    pub fn set_name(&self, name: Option<String>) {
        self.inner.state.lock().config.name = name;
    }

    /// Whether `on_memory_warning` currently triggers `remove_all`.
    #[must_use]
    pub fn remove_all_on_memory_warning(&self) -> bool {
        self.inner.state.lock().config.remove_all_on_memory_warning
    }

    /// Replaces the `on_memory_warning` purge policy.
    pub fn set_remove_all_on_memory_warning(&self, purge: bool) {
        self.inner.state.lock().config.remove_all_on_memory_warning = purge;
    }

    /// Whether `on_enter_background` currently triggers `remove_all`.
    #[must_use]
    pub fn remove_all_on_enter_background(&self) -> bool {
        self.inner.state.lock().config.remove_all_on_enter_background
    }

    /// Replaces the `on_enter_background` purge policy.
    pub fn set_remove_all_on_enter_background(&self, purge: bool) {
        self.inner.state.lock().config.remove_all_on_enter_background = purge;
    }

    /// Whether evicted values are currently routed to the main-thread queue.
    #[must_use]
    pub fn release_on_main_thread(&self) -> bool {
        self.inner.state.lock().config.release_on_main_thread
    }

    /// Replaces the main-thread release routing policy.
    pub fn set_release_on_main_thread(&self, on_main_thread: bool) {
        self.inner.state.lock().config.release_on_main_thread = on_main_thread;
    }

    /// Whether release currently dispatches onto the rayon pool rather than
    /// dropping inline.
    #[must_use]
    pub fn release_asynchronously(&self) -> bool {
        self.inner.state.lock().config.release_asynchronously
    }

    /// Replaces the asynchronous-release policy.
    pub fn set_release_asynchronously(&self, asynchronous: bool) {
        self.inner.state.lock().config.release_asynchronously = asynchronous;
    }

    /// Drains and runs every pending main-thread release job. Call this
    /// from whatever thread you consider "main" if
    /// [`CacheConfig::release_on_main_thread`] is set; otherwise it is
    /// always a no-op and never needs to be called.
    pub fn drain_main_thread_queue(&self) -> usize {
        self.inner.main_queue.drain()
    }

    /// Invokes the optional low-memory callback, then `remove_all()` if
    /// `remove_all_on_memory_warning` is set. The callback runs outside the
    /// lock so re-entrant calls from user code cannot deadlock.
    pub fn on_memory_warning(&self) {
        let (callback, should_purge) = {
            let state = self.inner.state.lock();
            (
                state.config.memory_warning_callback.clone(),
                state.config.remove_all_on_memory_warning,
            )
        };
        if let Some(cb) = callback {
            cb();
        }
        if should_purge {
            self.remove_all();
        }
    }

    /// Invokes the optional backgrounding callback, then `remove_all()` if
    /// `remove_all_on_enter_background` is set.
    pub fn on_enter_background(&self) {
        let (callback, should_purge) = {
            let state = self.inner.state.lock();
            (
                state.config.enter_background_callback.clone(),
                state.config.remove_all_on_enter_background,
            )
        };
        if let Some(cb) = callback {
            cb();
        }
        if should_purge {
            self.remove_all();
        }
    }

    /// Sets (or clears) the callback invoked before a memory-warning purge.
    pub fn set_memory_warning_callback(&self, callback: Option<crate::config::PurgeCallback>) {
        self.inner.state.lock().config.memory_warning_callback = callback;
    }

    /// Sets (or clears) the callback invoked before a backgrounding purge.
    pub fn set_enter_background_callback(&self, callback: Option<crate::config::PurgeCallback>) {
        self.inner.state.lock().config.enter_background_callback = callback;
    }

    fn release_policy(&self) -> (bool, bool) {
        let state = self.inner.state.lock();
        (
            state.config.release_on_main_thread,
            state.config.release_asynchronously,
        )
    }
}

impl<K, V> Default for MemoryCache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
