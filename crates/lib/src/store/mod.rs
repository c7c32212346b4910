//! Metadata store.
//!
//! The store holds what is known about the last build of every target and the
//! last processed state of every import. Staleness checks only read from it;
//! it is written by [`crate::stale::record_build`] and
//! [`crate::stale::process_imports`].
//!
//! # Layout
//!
//! ```text
//! store/
//! ├── targets/<key>.json     # TargetMeta, one per built target
//! ├── imports/<key>.json     # ImportMeta, one per processed import
//! └── values/<key>.json      # Stored values of object targets
//! ```
//!
//! `<key>` is the truncated hash of the node's display id.

mod disk;
mod types;

pub use disk::Store;
pub use types::*;
