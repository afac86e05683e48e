//! Cooperative-locking trim primitives and the background scheduler that
//! drives them.
//!
//! The trim loop never holds the cache lock across an unbounded amount of
//! work: it takes a non-blocking lock, checks the bound once, pops at most
//! one tail node, and releases the lock before looping again. Evicted
//! values accumulate in a caller-local holder and are only handed to the
//! release path once the whole pass is done, per the design's "yield the
//! lock between every single eviction" rationale.

use std::hash::Hash;
use std::io;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::engine::Inner;
use crate::recency_list::RecencyList;

/// A unit of work dispatched onto the serial trim queue.
pub(crate) enum TrimCommand {
    /// Enforce the count bound only (scheduled by `put` on count overshoot).
    Count,
    /// Enforce the cost bound only (scheduled by `put` on cost overshoot).
    Cost,
    /// Run the full `cost → count → age` pass (scheduled by the sweeper).
    FullSweep,
}

const LOCK_BACKOFF: Duration = Duration::from_millis(10);

/// Runs the cooperative-locking trim loop until `over_budget` reports the
/// bound is satisfied, then releases every evicted value as one batch.
pub(crate) fn run<K, V>(inner: &Arc<Inner<K, V>>, mut over_budget: impl FnMut(&RecencyList<K, V>) -> bool)
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    let mut holder: Vec<V> = Vec::new();

    loop {
        match inner.state.try_lock() {
            Some(mut state) => {
                if !over_budget(&state.list) {
                    break;
                }
                match state.list.pop_tail() {
                    Some((_, value)) => holder.push(value),
                    None => break,
                }
            }
            None => thread::sleep(LOCK_BACKOFF),
        }
    }

    if !holder.is_empty() {
        let (on_main, async_) = {
            let state = inner.state.lock();
            (
                state.config.release_on_main_thread,
                state.config.release_asynchronously,
            )
        };
        crate::release::release(holder, on_main, async_, &inner.main_queue);
    }
}

fn run_full_sweep<K, V>(inner: &Arc<Inner<K, V>>)
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    let (cost_limit, count_limit, age_limit) = {
        let state = inner.state.lock();
        (
            state.config.cost_limit,
            state.config.count_limit,
            state.config.age_limit,
        )
    };

    // Order matters: cost-first evicts the most expensive overruns first,
    // age-last sweeps survivors that have become stale independent of size.
    if let Some(limit) = cost_limit {
        run(inner, move |list| list.total_cost() > limit);
    }
    if let Some(limit) = count_limit {
        run(inner, move |list| list.total_count() > limit);
    }
    if let Some(max_age) = age_limit {
        run(inner, move |list| {
            list.tail_last_access().is_some_and(|ts| ts.elapsed() > max_age)
        });
    }
}

/// Spawns the dedicated worker that drains the serial trim queue. Serial by
/// construction: a single thread reading one channel cannot race with
/// itself, so a slow trim pass simply delays the next command rather than
/// running concurrently with it.
pub(crate) fn spawn_trim_worker<K, V>(
    inner: Arc<Inner<K, V>>,
    rx: Receiver<TrimCommand>,
) -> io::Result<thread::JoinHandle<()>>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    thread::Builder::new()
        .name("recency-cache-trim".into())
        .spawn(move || {
            for command in rx.iter() {
                match command {
                    TrimCommand::Count => {
                        let limit = inner.state.lock().config.count_limit;
                        if let Some(limit) = limit {
                            run(&inner, move |list| list.total_count() > limit);
                        }
                    }
                    TrimCommand::Cost => {
                        let limit = inner.state.lock().config.cost_limit;
                        if let Some(limit) = limit {
                            run(&inner, move |list| list.total_cost() > limit);
                        }
                    }
                    TrimCommand::FullSweep => run_full_sweep(&inner),
                }
            }
        })
}

/// Spawns the periodic sweeper. It holds only a `Weak` reference to the
/// engine: once the last `MemoryCache` handle drops, the next wakeup's
/// `upgrade()` fails and the thread exits without rescheduling itself.
pub(crate) fn spawn_sweeper<K, V>(
    weak: Weak<Inner<K, V>>,
    initial_interval: Duration,
) -> io::Result<thread::JoinHandle<()>>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + 'static,
{
    thread::Builder::new()
        .name("recency-cache-sweeper".into())
        .spawn(move || {
            let mut interval = initial_interval;
            loop {
                thread::sleep(interval);
                let Some(inner) = weak.upgrade() else {
                    tracing::debug!("cache dropped; sweeper exiting");
                    return;
                };
                interval = inner.state.lock().config.auto_trim_interval;
                if inner.trim_tx.send(TrimCommand::FullSweep).is_err() {
                    tracing::warn!("trim worker gone; sweeper exiting");
                    return;
                }
            }
        })
}

#[cfg(test)]
#[path = "trim_tests.rs"]
mod tests;
