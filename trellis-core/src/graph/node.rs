//! Graph Nodes
//!
//! This module defines the node type that lives in the dependency graph.

use std::fmt::Display;
use std::hash::Hash;

use indexmap::IndexSet;

/// Requirements for a value used as a node identifier.
///
/// Names (`String`, `&'static str`), numeric handles and composite keys all
/// qualify. `Display` is used when a node has to be named in an error.
pub trait NodeKey: Clone + Eq + Hash + Display {}

impl<T> NodeKey for T where T: Clone + Eq + Hash + Display {}

/// A node in the dependency graph.
///
/// Both edge directions are stored on the node so that a single edge can be
/// added or removed without touching any other part of the graph.
#[derive(Debug, Clone)]
pub struct Node<K: NodeKey> {
    /// Unique identifier for this node.
    id: K,

    /// Nodes that this node consumes.
    dependencies: IndexSet<K>,

    /// Nodes that consume this node (the reverse index).
    dependents: IndexSet<K>,
}

impl<K: NodeKey> Node<K> {
    /// Create a new node with no edges.
    pub fn new(id: K) -> Self {
        Self {
            id,
            dependencies: IndexSet::new(),
            dependents: IndexSet::new(),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> &K {
        &self.id
    }

    /// Add a dependency. Returns false if it was already present.
    pub(crate) fn add_dependency(&mut self, node_id: K) -> bool {
        self.dependencies.insert(node_id)
    }

    /// Remove a dependency. Returns false if it was not present.
    pub(crate) fn remove_dependency(&mut self, node_id: &K) -> bool {
        self.dependencies.shift_remove(node_id)
    }

    /// Get all dependencies, in the order they were added.
    pub fn dependencies(&self) -> &IndexSet<K> {
        &self.dependencies
    }

    pub(crate) fn add_dependent(&mut self, node_id: K) {
        self.dependents.insert(node_id);
    }

    pub(crate) fn remove_dependent(&mut self, node_id: &K) {
        self.dependents.shift_remove(node_id);
    }

    /// Get all dependents, in the order they were added.
    pub fn dependents(&self) -> &IndexSet<K> {
        &self.dependents
    }

    /// Whether this node has no dependencies.
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }
}
