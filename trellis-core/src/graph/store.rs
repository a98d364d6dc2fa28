//! Graph Store
//!
//! The store owns every node and keeps both edge directions in sync. It does
//! not reject cycles while edges are being added: a graph may pass through a
//! cyclic state mid-construction, and the cycle is only reported when someone
//! asks for an order (see [`DependencyGraph::topological_order`]).

use std::cell::OnceCell;

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use super::node::{Node, NodeKey};
use super::sort::topological_sort;
use crate::error::{GraphError, Result};

/// A directed dependency graph of building blocks.
///
/// Edges point from a dependent to the dependency it consumes. Nodes keep the
/// order in which they were added; that order is the tie-break for sorting.
#[derive(Debug, Clone)]
pub struct DependencyGraph<K: NodeKey> {
    /// All nodes in the graph, indexed by ID.
    nodes: IndexMap<K, Node<K>>,

    /// Topological order of the whole graph, cleared on every mutation.
    order: OnceCell<Vec<K>>,
}

impl<K: NodeKey> DependencyGraph<K> {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self {
            nodes: IndexMap::new(),
            order: OnceCell::new(),
        }
    }

    /// Build an edgeless graph. Duplicate IDs are added once.
    pub fn with_nodes<N>(nodes: N) -> Self
    where
        N: IntoIterator<Item = K>,
    {
        let mut graph = Self::new();
        for id in nodes {
            graph.add_node(id);
        }
        graph
    }

    /// Build a graph from a node list and `(dependent, dependency)` pairs.
    pub fn from_edges<N, E>(nodes: N, edges: E) -> Result<Self>
    where
        N: IntoIterator<Item = K>,
        E: IntoIterator<Item = (K, K)>,
    {
        let mut graph = Self::with_nodes(nodes);
        for (dependent, dependency) in edges {
            graph.add_dependency(&dependent, &dependency)?;
        }
        Ok(graph)
    }

    /// Add a node. Returns false if a node with this ID already exists, in
    /// which case the existing node and its edges are left alone.
    pub fn add_node(&mut self, id: K) -> bool {
        if self.nodes.contains_key(&id) {
            return false;
        }
        self.nodes.insert(id.clone(), Node::new(id));
        self.invalidate();
        true
    }

    /// Remove a node together with every edge that touches it.
    pub fn remove_node(&mut self, id: &K) -> Result<()> {
        let node = self
            .nodes
            .shift_remove(id)
            .ok_or_else(|| GraphError::unknown_node(id))?;

        for dependency in node.dependencies() {
            if let Some(dep) = self.nodes.get_mut(dependency) {
                dep.remove_dependent(id);
            }
        }
        for dependent in node.dependents() {
            if let Some(dependent_node) = self.nodes.get_mut(dependent) {
                dependent_node.remove_dependency(id);
            }
        }

        self.invalidate();
        Ok(())
    }

    /// Add a dependency edge: `dependent` consumes `dependency`.
    ///
    /// Adding an edge that already exists is a no-op.
    pub fn add_dependency(&mut self, dependent: &K, dependency: &K) -> Result<()> {
        self.ensure_known(dependency)?;
        let added = self
            .nodes
            .get_mut(dependent)
            .ok_or_else(|| GraphError::unknown_node(dependent))?
            .add_dependency(dependency.clone());

        if added {
            if let Some(dep_node) = self.nodes.get_mut(dependency) {
                dep_node.add_dependent(dependent.clone());
            }
            trace!(%dependent, %dependency, "edge added");
            self.invalidate();
        }
        Ok(())
    }

    /// Remove a dependency edge. Returns whether the edge existed.
    pub fn remove_dependency(&mut self, dependent: &K, dependency: &K) -> Result<bool> {
        self.ensure_known(dependency)?;
        let removed = self
            .nodes
            .get_mut(dependent)
            .ok_or_else(|| GraphError::unknown_node(dependent))?
            .remove_dependency(dependency);

        if removed {
            if let Some(dep_node) = self.nodes.get_mut(dependency) {
                dep_node.remove_dependent(dependent);
            }
            trace!(%dependent, %dependency, "edge removed");
            self.invalidate();
        }
        Ok(removed)
    }

    /// Replace every dependency of `dependent` with `dependencies`.
    ///
    /// Only the edges that actually differ are touched.
    pub fn set_dependencies<I>(&mut self, dependent: &K, dependencies: I) -> Result<()>
    where
        I: IntoIterator<Item = K>,
    {
        let wanted: IndexSet<K> = dependencies.into_iter().collect();
        for dependency in &wanted {
            self.ensure_known(dependency)?;
        }

        let stale: Vec<K> = self
            .dependencies(dependent)?
            .iter()
            .filter(|dep| !wanted.contains(*dep))
            .cloned()
            .collect();
        for dependency in &stale {
            self.remove_dependency(dependent, dependency)?;
        }
        for dependency in &wanted {
            self.add_dependency(dependent, dependency)?;
        }
        Ok(())
    }

    /// Get the direct dependencies of a node.
    pub fn dependencies(&self, id: &K) -> Result<&IndexSet<K>> {
        self.node(id).map(Node::dependencies)
    }

    /// Get the direct dependents of a node.
    pub fn dependents(&self, id: &K) -> Result<&IndexSet<K>> {
        self.node(id).map(Node::dependents)
    }

    /// Get a reference to a node.
    pub fn node(&self, id: &K) -> Result<&Node<K>> {
        self.nodes.get(id).ok_or_else(|| GraphError::unknown_node(id))
    }

    /// Whether a node with this ID exists.
    pub fn contains(&self, id: &K) -> bool {
        self.nodes.contains_key(id)
    }

    /// Node IDs in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = &K> + '_ {
        self.nodes.keys()
    }

    /// All `(dependent, dependency)` pairs, grouped by dependent.
    pub fn edges(&self) -> impl Iterator<Item = (&K, &K)> + '_ {
        self.nodes.values().flat_map(|node| {
            node.dependencies()
                .iter()
                .map(move |dependency| (node.id(), dependency))
        })
    }

    /// Get the total number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Topological order of the whole graph: dependencies before dependents,
    /// ties broken by insertion order.
    ///
    /// The order is cached until the next mutation. A cyclic graph fails with
    /// [`GraphError::CycleDetected`] every time it is asked.
    pub fn topological_order(&self) -> Result<&[K]> {
        if let Some(order) = self.order.get() {
            return Ok(order.as_slice());
        }

        let sorted = topological_sort(self.nodes.keys().cloned(), |id| {
            self.nodes
                .get(id)
                .map(|node| node.dependencies().iter().cloned().collect::<Vec<_>>())
                .unwrap_or_default()
        })?;
        Ok(self.order.get_or_init(|| sorted).as_slice())
    }

    pub(crate) fn ensure_known(&self, id: &K) -> Result<()> {
        if self.nodes.contains_key(id) {
            Ok(())
        } else {
            Err(GraphError::unknown_node(id))
        }
    }

    fn invalidate(&mut self) {
        self.order.take();
    }
}

impl<K: NodeKey> Default for DependencyGraph<K> {
    fn default() -> Self {
        Self::new()
    }
}
