//! Descendant Finder
//!
//! Given the nodes that changed, find every node that transitively consumes
//! one of them. These are the nodes that must be rebuilt.
//!
//! # Algorithm
//!
//! 1. Sort the whole graph (cached), so a cyclic graph fails up front
//! 2. Breadth-first search over the reverse edges, marking nodes visited
//!    before they are queued so nothing is visited twice
//! 3. Emit the visited nodes in global topological order
//!
//! Step 3 makes the result independent of traversal order, so executing the
//! returned list front to back always respects dependencies.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use super::node::NodeKey;
use super::store::DependencyGraph;
use crate::error::Result;

impl<K: NodeKey> DependencyGraph<K> {
    /// Every node that transitively depends on `start`, in topological order.
    ///
    /// `start` itself is not included.
    pub fn find_descendants(&self, start: &K) -> Result<Vec<K>> {
        self.find_descendants_of_many(std::slice::from_ref(start))
    }

    /// Union of the descendants of every node in `starts`, deduplicated and in
    /// topological order.
    ///
    /// A start node appears in the output only when it is itself a
    /// descendant of another start node.
    pub fn find_descendants_of_many<'a, I>(&self, starts: I) -> Result<Vec<K>>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let visited = self.reachable_dependents(starts)?;
        self.in_topological_order(&visited)
    }

    /// The start nodes together with all of their descendants, in
    /// topological order: everything that has to run after `starts` changed.
    pub fn dirty_set<'a, I>(&self, starts: I) -> Result<Vec<K>>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let starts: Vec<&K> = starts.into_iter().collect();
        let mut visited = self.reachable_dependents(starts.iter().copied())?;
        visited.extend(starts.into_iter().cloned());
        self.in_topological_order(&visited)
    }

    fn reachable_dependents<'a, I>(&self, starts: I) -> Result<HashSet<K>>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        // Fail on cycles before walking anything.
        self.topological_order()?;

        let mut visited: HashSet<K> = HashSet::new();
        let mut queue: VecDeque<&K> = VecDeque::new();

        for start in starts {
            for dependent in self.dependents(start)? {
                if visited.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }

        while let Some(id) = queue.pop_front() {
            for dependent in self.dependents(id)? {
                if visited.insert(dependent.clone()) {
                    queue.push_back(dependent);
                }
            }
        }

        debug!(descendants = visited.len(), "collected descendants");
        Ok(visited)
    }

    fn in_topological_order(&self, members: &HashSet<K>) -> Result<Vec<K>> {
        if members.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self
            .topological_order()?
            .iter()
            .filter(|id| members.contains(*id))
            .cloned()
            .collect())
    }
}
