//! remake-lib: staleness detection for reproducible pipelines
//!
//! Given a resolved build context (targets, their commands and dependencies,
//! declared imports), this crate decides which targets must be rebuilt and
//! which imports are missing:
//! - `graph`: node identities and the dependency DAG
//! - `manifest`: the resolved context document
//! - `context`: the validated, read-only bundle discovery works on
//! - `store`: recorded metadata of previous builds
//! - `stale`: the discovery algorithms themselves

pub mod consts;
pub mod context;
pub mod graph;
pub mod manifest;
pub mod platform;
pub mod stale;
pub mod store;
pub mod util;
