//! Build identity and store bookkeeping.
//!
//! A build is identified by its key, a hash over everything that decides the
//! produced binaries. The key names the build's folder in the store and its
//! lock, and a completion marker in that folder turns later runs with the same
//! key into cache hits.
//!
//! # Submodules
//!
//! - [`key`] - build key computation
//! - [`layout`] - source/build/generators/package folders of a key
//! - [`lock`] - exclusive per-key file locks
//! - [`marker`] - completion marker and cache state

pub mod key;
pub mod layout;
pub mod lock;
pub mod marker;

pub use key::build_key;
pub use layout::BuildLayout;
pub use lock::{BuildLock, BuildLockError};
pub use marker::{BuildMarker, CacheState, MarkerError, cache_state, write_marker};
