//! Persistent cache of built executables
//!
//! Entries are keyed by package directory and fingerprint. Two processes
//! building the same package serialize on a per-package directory lock; the
//! loser finds the entry already present and skips its build.
//!
//! # Entry Lifecycle
//!
//! | State | On disk | Next step |
//! |-------|---------|-----------|
//! | Missing | nothing at the entry path | lock, build, clean up |
//! | Present | executable at the entry path | exec |
//! | Evicted | removed by cleanup | rebuilt on next use |

pub mod lock;
pub mod store;

pub use lock::DirLock;
pub use store::{CacheStore, Probe, DEFAULT_KEEP_ENTRIES};
