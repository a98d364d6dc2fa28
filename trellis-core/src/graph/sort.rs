//! Topological Sorter
//!
//! Kahn's algorithm over any node type. The caller hands in the node set and a
//! function that yields each node's dependencies, so building blocks,
//! executable nodes and live-update nodes all share one sorter.
//!
//! # Algorithm
//!
//! 1. Give every node an in-degree equal to its number of distinct dependencies
//! 2. Seed the ready set with every node whose in-degree is zero
//! 3. Repeatedly emit the ready node that came first in the input, then
//!    decrement the in-degree of everything that depends on it
//! 4. If fewer nodes were emitted than were given, the rest sit on or behind
//!    a cycle
//!
//! Ordering the ready set by input position (rather than a plain FIFO) makes
//! the output a pure function of the input order.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::warn;

use super::node::NodeKey;
use crate::error::{GraphError, Result};

/// Sort `nodes` so that every node comes after all of its dependencies.
///
/// `dependencies_of` is called once per node. Dependencies that are not part
/// of `nodes` fail with [`GraphError::UnknownNode`]; duplicate entries count
/// once. A cycle fails with [`GraphError::CycleDetected`] naming every node
/// that could not be emitted, in input order.
pub fn topological_sort<K, I, F, D>(nodes: I, mut dependencies_of: F) -> Result<Vec<K>>
where
    K: NodeKey,
    I: IntoIterator<Item = K>,
    F: FnMut(&K) -> D,
    D: IntoIterator<Item = K>,
{
    let order: IndexSet<K> = nodes.into_iter().collect();
    let mut in_degree = vec![0usize; order.len()];
    let mut dependents: Vec<SmallVec<[usize; 4]>> = vec![SmallVec::new(); order.len()];

    for (pos, node) in order.iter().enumerate() {
        let mut seen: SmallVec<[usize; 8]> = SmallVec::new();
        for dependency in dependencies_of(node) {
            let dep_pos = order
                .get_index_of(&dependency)
                .ok_or_else(|| GraphError::unknown_node(&dependency))?;
            if !seen.contains(&dep_pos) {
                seen.push(dep_pos);
                in_degree[pos] += 1;
                dependents[dep_pos].push(pos);
            }
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = in_degree
        .iter()
        .enumerate()
        .filter(|(_, degree)| **degree == 0)
        .map(|(pos, _)| Reverse(pos))
        .collect();

    let mut emitted = vec![false; order.len()];
    let mut result = Vec::with_capacity(order.len());

    while let Some(Reverse(pos)) = ready.pop() {
        emitted[pos] = true;
        result.push(order[pos].clone());

        for &dependent in &dependents[pos] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                ready.push(Reverse(dependent));
            }
        }
    }

    if result.len() < order.len() {
        let remaining: Vec<String> = order
            .iter()
            .zip(&emitted)
            .filter(|(_, done)| !**done)
            .map(|(node, _)| node.to_string())
            .collect();
        warn!(remaining = remaining.len(), "topological sort found a cycle");
        return Err(GraphError::CycleDetected { remaining });
    }

    Ok(result)
}
