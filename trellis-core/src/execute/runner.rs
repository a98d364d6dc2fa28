//! Running executable nodes in dependency order.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::{debug, info, warn};

use super::node::ExecutableNode;
use crate::error::{GraphError, Result};
use crate::graph::{topological_sort, DependencyGraph, NodeKey};

/// What happened during one run over an execution order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport<K> {
    /// Nodes whose components ran, in execution order (including failures).
    pub executed: Vec<K>,

    /// One error per failing component: the component's own error when it
    /// kept one, otherwise [`GraphError::ExecutionFailure`].
    pub failures: Vec<GraphError>,

    /// Nodes not run because a dependency failed or was skipped.
    pub skipped: Vec<K>,

    /// Nodes not reached because the caller stopped the run.
    pub cancelled: Vec<K>,
}

impl<K> ExecutionReport<K> {
    fn new() -> Self {
        Self {
            executed: Vec::new(),
            failures: Vec::new(),
            skipped: Vec::new(),
            cancelled: Vec::new(),
        }
    }

    /// Whether every node in the order ran and succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && self.skipped.is_empty() && self.cancelled.is_empty()
    }
}

/// Sort a set of executable nodes so that producers run before consumers.
pub fn sort_nodes<K: NodeKey>(nodes: &IndexMap<K, ExecutableNode<K>>) -> Result<Vec<K>> {
    topological_sort(nodes.keys().cloned(), |id| {
        nodes
            .get(id)
            .map(|node| node.dependencies().iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default()
    })
}

/// Execute `nodes` strictly in `order`.
///
/// Every id in `order` must name a node in `nodes`. A node listed before one
/// of its own dependencies is a programming error and trips a debug
/// assertion. A node whose dependency failed (or was skipped) in this run is
/// skipped; unrelated branches still run.
pub fn execute_graph<K: NodeKey>(
    nodes: &mut IndexMap<K, ExecutableNode<K>>,
    order: &[K],
) -> Result<ExecutionReport<K>> {
    execute_graph_with(nodes, order, |_| true)
}

/// [`execute_graph`] with a hook checked before each node. Returning false
/// stops the run; the node and everything after it is reported as cancelled.
pub fn execute_graph_with<K, F>(
    nodes: &mut IndexMap<K, ExecutableNode<K>>,
    order: &[K],
    mut keep_going: F,
) -> Result<ExecutionReport<K>>
where
    K: NodeKey,
    F: FnMut(&K) -> bool,
{
    let position: HashMap<&K, usize> = order.iter().enumerate().map(|(i, id)| (id, i)).collect();
    for (index, id) in order.iter().enumerate() {
        let node = nodes.get(id).ok_or_else(|| GraphError::unknown_node(id))?;
        for dependency in node.dependencies() {
            if let Some(&dep_index) = position.get(dependency) {
                debug_assert!(
                    dep_index < index,
                    "node '{id}' is ordered before its dependency '{dependency}'"
                );
            }
        }
    }

    let mut report = ExecutionReport::new();
    let mut broken: HashSet<&K> = HashSet::new();

    for (index, id) in order.iter().enumerate() {
        if !keep_going(id) {
            info!(node = %id, remaining = order.len() - index, "execution cancelled");
            report.cancelled.extend(order[index..].iter().cloned());
            break;
        }

        let node = nodes.get_mut(id).ok_or_else(|| GraphError::unknown_node(id))?;

        if node.dependencies().iter().any(|dep| broken.contains(dep)) {
            debug!(node = %id, "skipped, an input failed");
            broken.insert(id);
            report.skipped.push(id.clone());
            continue;
        }

        let failed = node.run_components();
        report.executed.push(id.clone());
        if !failed.is_empty() {
            broken.insert(id);
            report.failures.extend(failed);
        }
    }

    if report.is_success() {
        debug!(nodes = report.executed.len(), "execution complete");
    } else {
        warn!(
            failures = report.failures.len(),
            skipped = report.skipped.len(),
            cancelled = report.cancelled.len(),
            "execution finished with problems"
        );
    }
    Ok(report)
}

/// An owned set of executable nodes that can be run in full or incrementally.
pub struct BuildPlan<K: NodeKey> {
    nodes: IndexMap<K, ExecutableNode<K>>,
}

impl<K: NodeKey> BuildPlan<K> {
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
        }
    }

    /// Add a node, replacing any node with the same id.
    pub fn insert(&mut self, node: ExecutableNode<K>) {
        self.nodes.insert(node.id().clone(), node);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, node: ExecutableNode<K>) -> Self {
        self.insert(node);
        self
    }

    pub fn node(&self, id: &K) -> Option<&ExecutableNode<K>> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: &K) -> Option<&mut ExecutableNode<K>> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ExecutableNode<K>> + '_ {
        self.nodes.values()
    }

    /// The dependency graph described by the nodes' declared dependencies.
    pub fn graph(&self) -> Result<DependencyGraph<K>> {
        DependencyGraph::from_edges(
            self.nodes.keys().cloned(),
            self.nodes.values().flat_map(|node| {
                node.dependencies()
                    .iter()
                    .map(move |dependency| (node.id().clone(), dependency.clone()))
            }),
        )
    }

    /// Execute every node in topological order.
    pub fn execute_all(&mut self) -> Result<ExecutionReport<K>> {
        let order = sort_nodes(&self.nodes)?;
        execute_graph(&mut self.nodes, &order)
    }

    /// Execute the changed nodes and everything downstream of them.
    pub fn execute_changed(&mut self, changed: &[K]) -> Result<ExecutionReport<K>> {
        let order = self.graph()?.dirty_set(changed)?;
        debug!(changed = changed.len(), dirty = order.len(), "incremental execution");
        execute_graph(&mut self.nodes, &order)
    }
}

impl<K: NodeKey> Default for BuildPlan<K> {
    fn default() -> Self {
        Self::new()
    }
}
