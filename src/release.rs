//! Deferred destruction of evicted values.
//!
//! Eviction always runs under the cache lock; destroying the evicted value
//! must not. This module is the ownership-transfer point: whoever pops a
//! node off the recency list hands the resulting value here, *after*
//! releasing the lock, and it is dropped somewhere else entirely.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// A queue of pending drops for environments with a real "main thread"
/// (a UI toolkit's event loop, for instance). There is no portable notion
/// of a main thread in a platform-independent library, so pumping this
/// queue is the embedder's job: call [`MainThreadQueue::drain`] from
/// whatever thread you consider main.
pub(crate) struct MainThreadQueue {
    jobs: Mutex<VecDeque<Box<dyn FnOnce() + Send>>>,
}

impl MainThreadQueue {
    pub(crate) fn new() -> Self {
        Self {
            jobs: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, job: Box<dyn FnOnce() + Send>) {
        self.jobs.lock().push_back(job);
    }

    /// Runs every job currently queued, in FIFO order. Returns how many ran.
    pub(crate) fn drain(&self) -> usize {
        let pending: Vec<_> = {
            let mut jobs = self.jobs.lock();
            jobs.drain(..).collect()
        };
        let ran = pending.len();
        for job in pending {
            job();
        }
        ran
    }
}

impl Default for MainThreadQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes an evicted value (or a batch of them, via any `Send + 'static`
/// holder) to the configured release path. Never blocks the caller beyond
/// handing ownership off.
pub(crate) fn release<T: Send + 'static>(
    value: T,
    release_on_main_thread: bool,
    release_asynchronously: bool,
    main_queue: &MainThreadQueue,
) {
    if release_on_main_thread {
        main_queue.push(Box::new(move || drop(value)));
        return;
    }
    if release_asynchronously {
        rayon::spawn(move || drop(value));
    } else {
        drop(value);
    }
}

#[cfg(test)]
#[path = "release_tests.rs"]
mod tests;
