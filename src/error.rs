//! Error types for the cache's internal machinery.
//!
//! The public cache contract has no fallible operations (a miss is not an
//! error, and `None`/absent keys are documented benign no-ops). This type
//! exists only for the narrow set of implementation-defined termination
//! conditions the design calls out: background worker threads that fail to
//! start. Everything else prefers to crash loudly rather than limp on with
//! a corrupted index/list bijection.

use thiserror::Error;

/// Result type alias for the cache's internal setup paths.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced while standing up the cache's background workers.
#[derive(Error, Debug)]
pub enum Error {
    /// The serial trim-dispatch worker thread failed to spawn (CACHE-001).
    #[error("[CACHE-001] failed to spawn trim worker thread: {0}")]
    TrimWorkerSpawn(#[source] std::io::Error),

    /// The periodic sweeper thread failed to spawn (CACHE-002).
    #[error("[CACHE-002] failed to spawn sweeper thread: {0}")]
    SweeperSpawn(#[source] std::io::Error),
}

impl Error {
    /// Returns the error code (e.g., "CACHE-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::TrimWorkerSpawn(_) => "CACHE-001",
            Self::SweeperSpawn(_) => "CACHE-002",
        }
    }
}
