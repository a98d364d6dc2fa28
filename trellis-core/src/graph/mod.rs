//! Dependency Graph
//!
//! This module implements the build-orchestration graph that tracks
//! relationships between building blocks.
//!
//! # Overview
//!
//! The dependency graph is a directed graph where:
//!
//! - Nodes represent building blocks, or anything else that has to be
//!   (re)computed in order
//! - Edges represent dependencies: if A consumes B, there is an edge from A to B
//!
//! When a node changes, we walk the reverse edges to find everything that is
//! now stale, and hand that set back in an order that can be executed as-is.
//!
//! # Design Decisions
//!
//! 1. The graph is an owned value passed by reference; there is no global
//!    graph.
//!
//! 2. Edges are ID-based adjacency sets rather than object references, so
//!    cycle checks and mutations are local data operations.
//!
//! 3. We maintain both forward (dependencies) and reverse (dependents) edges
//!    so that a single edge mutation updates exactly one pair of sets.
//!
//! 4. Cycles are tolerated while edges are being mutated and reported when an
//!    order is requested.

mod descendants;
mod node;
mod sort;
mod store;

pub use node::{Node, NodeKey};
pub use sort::topological_sort;
pub use store::DependencyGraph;
