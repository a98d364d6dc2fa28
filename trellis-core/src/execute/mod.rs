//! Executable Nodes
//!
//! A building block is produced by one or more components (a boolean, a
//! wrap, a remesh...). An [`ExecutableNode`] owns those components and runs
//! them together; [`execute_graph`] runs many nodes in an order produced by
//! the sorter or the descendant finder.
//!
//! # Failure policy
//!
//! - Within a node every component runs, even after a sibling fails
//! - A failing node is reported as one error per failing component: the
//!   component's own error if it kept one, else `ExecutionFailure`
//! - Nodes downstream of a failure are skipped; independent branches still run
//! - Cancellation is only checked between nodes

mod component;
mod node;
mod runner;

pub use component::{Component, FnComponent};
pub use node::ExecutableNode;
pub use runner::{execute_graph, execute_graph_with, sort_nodes, BuildPlan, ExecutionReport};
