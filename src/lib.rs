//! # `recency_cache`
//!
//! A thread-safe, in-process least-recently-used (LRU) memory cache bounded
//! by entry count, aggregate cost, and entry age.
//!
//! Built for caching decoded images, parsed documents, or any precomputed
//! artifact whose recomputation is expensive relative to its memory
//! footprint — the kind of thing you want evicted under pressure, but never
//! synchronously in the way of a hot-path reader or writer.
//!
//! ## Quick start
//!
//! ```
//! use recency_cache::MemoryCache;
//!
//! let cache: MemoryCache<String, String> = MemoryCache::new();
//! cache.put("greeting".to_string(), "hello".to_string());
//! assert_eq!(cache.get(&"greeting".to_string()), Some("hello".to_string()));
//! ```
//!
//! ## Design
//!
//! Three layers, leaf-first:
//!
//! - a non-thread-safe doubly-linked recency list paired with an
//!   associative index, giving O(1) insert/touch/remove/pop-tail;
//! - the engine behind it, wrapping the list in a single
//!   [`parking_lot::Mutex`] and publishing [`MemoryCache`]'s thread-safe
//!   contract;
//! - a cooperative-locking eviction loop plus the background
//!   sweeper/serial-queue pair that keep the three bounds honest without
//!   blocking foreground access.
//!
//! Evicted values never drop under the cache lock: they are routed to a
//! rayon task, a main-thread queue the embedder drains, or an inline drop
//! at the release site, per [`config::CacheConfig`]'s policy flags.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
mod engine;
mod entry;
pub mod error;
mod recency_list;
mod release;
mod trim;

pub use config::CacheConfig;
pub use engine::MemoryCache;
pub use error::{Error, Result};
