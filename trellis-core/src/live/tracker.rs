//! Entity Identity Tracker
//!
//! Keeps the latest snapshot of every tracked entity and tells the caller
//! what appeared, disappeared or changed since then.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use super::entity::{EntityId, EntitySnapshot, Identifiable};
use crate::error::{GraphError, Result};

/// Difference between the tracked snapshots and an observed state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityDiff {
    /// New entities, in observed order.
    pub added: Vec<EntitySnapshot>,

    /// Entities whose content changed, with their new snapshot.
    pub changed: Vec<EntitySnapshot>,

    /// Tracked entities that are no longer observed, in tracked order.
    pub removed: Vec<EntityId>,

    pub unchanged: Vec<EntityId>,
}

impl EntityDiff {
    /// Whether nothing was added, changed or removed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }

    /// IDs of added and changed entities.
    pub fn dirty_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.added
            .iter()
            .chain(&self.changed)
            .map(|snapshot| snapshot.entity_id)
    }
}

/// Registry of the latest snapshot per entity.
#[derive(Debug, Clone, Default)]
pub struct EntityTracker {
    snapshots: IndexMap<EntityId, EntitySnapshot>,
}

impl EntityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `current` against the tracked snapshots without committing.
    pub fn diff<E: Identifiable>(&self, current: &[E]) -> Result<EntityDiff> {
        let mut diff = EntityDiff::default();
        let mut seen = HashSet::with_capacity(current.len());

        for entity in current {
            let snapshot = EntitySnapshot::capture(entity)?;
            let id = snapshot.entity_id;
            if !seen.insert(id) {
                return Err(GraphError::DuplicateEntity(id));
            }

            match self.snapshots.get(&id) {
                None => diff.added.push(snapshot),
                Some(previous) if previous.same_content(&snapshot) => diff.unchanged.push(id),
                Some(_) => diff.changed.push(snapshot),
            }
        }

        diff.removed = self
            .snapshots
            .keys()
            .filter(|id| !seen.contains(*id))
            .copied()
            .collect();

        debug!(
            added = diff.added.len(),
            changed = diff.changed.len(),
            removed = diff.removed.len(),
            unchanged = diff.unchanged.len(),
            "entity diff"
        );
        Ok(diff)
    }

    /// Commit a diff produced by [`diff`](Self::diff).
    ///
    /// Changed snapshots keep their position; added ones are appended.
    pub fn apply(&mut self, diff: &EntityDiff) {
        for id in &diff.removed {
            self.snapshots.shift_remove(id);
        }
        for snapshot in diff.added.iter().chain(&diff.changed) {
            self.snapshots.insert(snapshot.entity_id, snapshot.clone());
        }
    }

    /// Replace the tracked set wholesale with the state of `entities`.
    pub fn snapshot<E: Identifiable>(&mut self, entities: &[E]) -> Result<()> {
        let mut snapshots = IndexMap::with_capacity(entities.len());
        for entity in entities {
            let snapshot = EntitySnapshot::capture(entity)?;
            let id = snapshot.entity_id;
            if snapshots.insert(id, snapshot).is_some() {
                return Err(GraphError::DuplicateEntity(id));
            }
        }
        self.snapshots = snapshots;
        Ok(())
    }

    /// Replace the tracked set with persisted snapshots.
    pub fn restore<I>(&mut self, snapshots: I) -> Result<()>
    where
        I: IntoIterator<Item = EntitySnapshot>,
    {
        let mut restored = IndexMap::new();
        for snapshot in snapshots {
            let id = snapshot.entity_id;
            if restored.insert(id, snapshot).is_some() {
                return Err(GraphError::DuplicateEntity(id));
            }
        }
        self.snapshots = restored;
        Ok(())
    }

    pub fn get(&self, id: &EntityId) -> Option<&EntitySnapshot> {
        self.snapshots.get(id)
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.snapshots.contains_key(id)
    }

    /// Snapshots in tracked order.
    pub fn snapshots(&self) -> impl Iterator<Item = &EntitySnapshot> + '_ {
        self.snapshots.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> + '_ {
        self.snapshots.keys()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
