//! Dependency graph model.
//!
//! - [`node`] - node identities (objects and files)
//! - [`dag`] - the DAG used for both the full graph and the build schedule

pub mod dag;
pub mod node;

pub use dag::{DependencyGraph, GraphError};
pub use node::{NodeId, NodeIdError};
