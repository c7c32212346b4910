//! Resolved context documents.
//!
//! A context document is the JSON result of resolving a pipeline plan: every
//! target with its command and direct dependencies, the declared imports, the
//! bound import objects and the prework steps to run before discovery.

mod types;

pub use types::*;
