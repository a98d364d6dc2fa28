//! Live-Update / Recheck Handler
//!
//! The handler keeps three things in step: the entity snapshots, the check
//! results, and a cascade graph that says which results were computed from
//! which entities.
//!
//! # Cascade graph
//!
//! Nodes are either an entity (`Entity(id)`) or one result
//! (`Check(kind, id)`). A result depends on its own entity and on every entity
//! listed in its `related` ids. Results only ever depend on entities, so the
//! graph stays acyclic even when two results list each other.
//!
//! # Update
//!
//! 1. Diff the observed state against the snapshots
//! 2. Everything downstream of an added, changed or removed entity is stale
//! 3. Recheck the stale results in topological order, rewiring each result's
//!    edges from its fresh `related` list
//! 4. A fresh result that lists an entity for the first time makes that
//!    entity's result of the same kind stale too (vicinity is symmetric)
//! 5. Purge removed entities (snapshot, results, graph nodes)
//! 6. Commit the snapshots
//!
//! An update either lands completely or not at all. Every node, edge and
//! result a pass touches is journaled first, and a failing checker rolls the
//! journal back before the error is returned. The changed entities are then
//! still reported as changed on the next update, and their cascade is worked
//! out against the same edges as before.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info, instrument, warn};

use super::checker::{CheckContext, CheckKind, Checker, CheckerPipeline};
use super::entity::{EntityId, EntitySnapshot, Identifiable};
use super::results::{ResultDatabase, ResultEntry, ResultStore};
use super::tracker::{EntityDiff, EntityTracker};
use crate::config::TrellisConfig;
use crate::error::{GraphError, Result};
use crate::graph::DependencyGraph;

/// A node of the cascade graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TrackedNode {
    /// The snapshot of an entity.
    Entity(EntityId),
    /// One check result of an entity.
    Check(CheckKind, EntityId),
}

impl fmt::Display for TrackedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackedNode::Entity(id) => write!(f, "entity:{id}"),
            TrackedNode::Check(kind, id) => write!(f, "{kind}:{id}"),
        }
    }
}

/// What one [`LiveUpdateHandler::update`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: Vec<EntityId>,
    pub changed: Vec<EntityId>,
    pub removed: Vec<EntityId>,

    /// Entities with at least one result rewritten, in recheck order.
    pub rechecked: Vec<EntityId>,
}

impl UpdateSummary {
    /// Whether the update left everything untouched.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty()
            && self.changed.is_empty()
            && self.removed.is_empty()
            && self.rechecked.is_empty()
    }

    /// Every entity the update touched, deduplicated.
    pub fn affected(&self) -> Vec<EntityId> {
        let all: IndexSet<EntityId> = self
            .added
            .iter()
            .chain(&self.changed)
            .chain(&self.removed)
            .chain(&self.rechecked)
            .copied()
            .collect();
        all.into_iter().collect()
    }
}

/// What a pass changed, so a failed pass can be undone.
#[derive(Debug, Default)]
struct Journal {
    /// Graph nodes the pass created.
    added: IndexSet<TrackedNode>,
    /// Dependencies of rewired nodes as they were before the pass.
    edges: IndexMap<TrackedNode, IndexSet<TrackedNode>>,
    /// Results as they were before the pass, `None` where there was none.
    results: IndexMap<(CheckKind, EntityId), Option<ResultEntry>>,
}

/// Tracks entities across edits and keeps their check results current.
#[derive(Debug, Clone, Default)]
pub struct LiveUpdateHandler {
    config: TrellisConfig,
    tracker: EntityTracker,
    results: ResultStore,
    graph: DependencyGraph<TrackedNode>,
}

impl LiveUpdateHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TrellisConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Rebuild a handler from its persisted form.
    ///
    /// Every result must belong to a persisted snapshot.
    pub fn from_database(db: ResultDatabase, config: TrellisConfig) -> Result<Self> {
        let mut handler = Self::with_config(config);
        handler.tracker.restore(db.latest_snapshots)?;
        for id in handler.tracker.ids() {
            handler.graph.add_node(TrackedNode::Entity(*id));
        }

        for entry in db.results {
            if !handler.tracker.contains(&entry.entity_id) {
                return Err(GraphError::UnknownEntity(entry.entity_id));
            }
            let node = TrackedNode::Check(entry.check_kind.clone(), entry.entity_id);
            handler.graph.add_node(node.clone());
            handler.link(&node, entry.entity_id, &entry.related)?;
            handler.results.upsert(entry);
        }

        debug!(
            entities = handler.tracker.len(),
            results = handler.results.len(),
            "handler restored"
        );
        Ok(handler)
    }

    /// Decode a handler persisted with [`to_bytes`](Self::to_bytes).
    pub fn from_bytes(bytes: &[u8], config: TrellisConfig) -> Result<Self> {
        let db = ResultDatabase::from_bytes(&config.codec(), bytes)?;
        Self::from_database(db, config)
    }

    /// Bring snapshots and results in line with `current`.
    ///
    /// Only new, changed and removed entities, and the results computed from
    /// them, are touched. Calling this again with the same state is a no-op.
    #[instrument(skip_all, fields(entities = current.len()))]
    pub fn update<E: Identifiable>(
        &mut self,
        current: &[E],
        pipeline: &CheckerPipeline<E>,
    ) -> Result<UpdateSummary> {
        let diff = self.tracker.diff(current)?;
        if diff.is_empty() {
            debug!("nothing changed");
            return Ok(UpdateSummary::default());
        }

        let mut journal = Journal::default();
        let rechecked = match self.recheck_stale(&diff, current, pipeline, &mut journal) {
            Ok(rechecked) => rechecked,
            Err(err) => {
                warn!(error = %err, "update failed, rolling back");
                self.roll_back(journal)?;
                return Err(err);
            }
        };

        for &id in &diff.removed {
            self.purge(id)?;
        }
        self.tracker.apply(&diff);

        let summary = UpdateSummary {
            added: diff.added.iter().map(|s| s.entity_id).collect(),
            changed: diff.changed.iter().map(|s| s.entity_id).collect(),
            removed: diff.removed,
            rechecked: rechecked.into_iter().collect(),
        };
        info!(
            added = summary.added.len(),
            changed = summary.changed.len(),
            removed = summary.removed.len(),
            rechecked = summary.rechecked.len(),
            "live update applied"
        );
        Ok(summary)
    }

    /// Steps 2 to 4 of an update. Everything it changes goes through
    /// `journal`.
    fn recheck_stale<E: Identifiable>(
        &mut self,
        diff: &EntityDiff,
        current: &[E],
        pipeline: &CheckerPipeline<E>,
        journal: &mut Journal,
    ) -> Result<IndexSet<EntityId>> {
        let kinds = pipeline.kinds();
        let dirty: Vec<EntityId> = diff.dirty_ids().collect();
        for &id in &dirty {
            self.ensure_nodes(id, &kinds, journal)?;
        }

        let starts: Vec<TrackedNode> = dirty
            .iter()
            .chain(&diff.removed)
            .map(|&id| TrackedNode::Entity(id))
            .filter(|node| self.graph.contains(node))
            .collect();
        let stale = self.graph.find_descendants_of_many(&starts)?;

        let removed: HashSet<EntityId> = diff.removed.iter().copied().collect();
        let mut pending: VecDeque<TrackedNode> = stale
            .into_iter()
            .filter(|node| matches!(node, TrackedNode::Check(_, owner) if !removed.contains(owner)))
            .collect();
        let mut queued: HashSet<TrackedNode> = pending.iter().cloned().collect();
        let context = CheckContext::new(current);
        let mut rechecked: IndexSet<EntityId> = IndexSet::new();

        while let Some(node) = pending.pop_front() {
            let TrackedNode::Check(kind, owner) = &node else {
                continue;
            };
            let Some(checker) = pipeline.get(kind) else {
                debug!(check = %node, "no checker for this kind, result left as is");
                continue;
            };

            let newly_related = self.run_check(checker, *owner, &context, journal)?;
            rechecked.insert(*owner);

            if self.config.cascade_related {
                for other in newly_related {
                    let neighbour = TrackedNode::Check(kind.clone(), other);
                    if self.graph.contains(&neighbour) && queued.insert(neighbour.clone()) {
                        debug!(from = %node, to = %neighbour, "cascading to new neighbour");
                        pending.push_back(neighbour);
                    }
                }
            }
        }
        Ok(rechecked)
    }

    /// Re-run one check kind for exactly `targets`, without diffing.
    ///
    /// Used when something outside the entities (a case-wide setting)
    /// invalidates one kind of result. No other result is touched and
    /// snapshots are left alone. Returns the rechecked ids. If one target
    /// fails, none of them is rewritten.
    #[instrument(skip_all, fields(kind = %kind, targets = targets.len()))]
    pub fn recheck_certain_result<E: Identifiable>(
        &mut self,
        pipeline: &CheckerPipeline<E>,
        kind: &CheckKind,
        targets: &[EntityId],
        current: &[E],
    ) -> Result<Vec<EntityId>> {
        let checker = pipeline
            .get(kind)
            .ok_or_else(|| GraphError::UnknownCheck(kind.clone()))?;
        let context = CheckContext::new(current);

        let targets: IndexSet<EntityId> = targets.iter().copied().collect();
        if let Some(missing) = targets
            .iter()
            .find(|id| !self.tracker.contains(id) || context.get(id).is_none())
        {
            return Err(GraphError::UnknownEntity(*missing));
        }

        let mut journal = Journal::default();
        for &id in &targets {
            if let Err(err) = self.run_check(checker, id, &context, &mut journal) {
                warn!(error = %err, "targeted recheck failed, rolling back");
                self.roll_back(journal)?;
                return Err(err);
            }
        }

        info!(rechecked = targets.len(), "targeted recheck applied");
        Ok(targets.into_iter().collect())
    }

    /// Throw away all state and rebuild it from `current`.
    pub fn rebuild<E: Identifiable>(
        &mut self,
        current: &[E],
        pipeline: &CheckerPipeline<E>,
    ) -> Result<UpdateSummary> {
        *self = Self::with_config(self.config.clone());
        self.update(current, pipeline)
    }

    /// Export snapshots and results for persistence.
    pub fn serializable_data(&self) -> ResultDatabase {
        ResultDatabase {
            latest_snapshots: self.tracker.snapshots().cloned().collect(),
            results: self.results.entries().to_vec(),
        }
    }

    /// Encode [`serializable_data`](Self::serializable_data) with the
    /// configured codec.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        self.serializable_data().to_bytes(&self.config.codec())
    }

    pub fn result(&self, entity_id: &EntityId, kind: &CheckKind) -> Option<&ResultEntry> {
        self.results.get(entity_id, kind)
    }

    pub fn results_for(&self, entity_id: &EntityId) -> Vec<&ResultEntry> {
        self.results.for_entity(*entity_id).collect()
    }

    pub fn snapshot(&self, entity_id: &EntityId) -> Option<&EntitySnapshot> {
        self.tracker.get(entity_id)
    }

    /// Results that would go stale if `entity_id` changed, in recheck order.
    pub fn results_depending_on(&self, entity_id: &EntityId) -> Result<Vec<(CheckKind, EntityId)>> {
        let descendants = self
            .graph
            .find_descendants(&TrackedNode::Entity(*entity_id))
            .map_err(|err| match err {
                GraphError::UnknownNode(_) => GraphError::UnknownEntity(*entity_id),
                other => other,
            })?;
        Ok(descendants
            .into_iter()
            .filter_map(|node| match node {
                TrackedNode::Check(kind, owner) => Some((kind, owner)),
                TrackedNode::Entity(_) => None,
            })
            .collect())
    }

    pub fn tracked_len(&self) -> usize {
        self.tracker.len()
    }

    pub fn config(&self) -> &TrellisConfig {
        &self.config
    }

    pub fn cascade_graph(&self) -> &DependencyGraph<TrackedNode> {
        &self.graph
    }

    fn ensure_nodes(&mut self, id: EntityId, kinds: &[CheckKind], journal: &mut Journal) -> Result<()> {
        let entity = TrackedNode::Entity(id);
        if self.graph.add_node(entity.clone()) {
            journal.added.insert(entity.clone());
        }
        for kind in kinds {
            let check = TrackedNode::Check(kind.clone(), id);
            if self.graph.add_node(check.clone()) {
                journal.added.insert(check.clone());
                self.graph.add_dependency(&check, &entity)?;
            }
        }
        Ok(())
    }

    /// Undo everything recorded in `journal`.
    fn roll_back(&mut self, journal: Journal) -> Result<()> {
        let Journal {
            added,
            edges,
            results,
        } = journal;

        for ((kind, owner), previous) in results {
            match previous {
                Some(entry) => {
                    self.results.upsert(entry);
                }
                None => {
                    self.results.remove(&owner, &kind);
                }
            }
        }
        for (node, dependencies) in edges {
            if !added.contains(&node) {
                self.graph.set_dependencies(&node, dependencies)?;
            }
        }
        for node in &added {
            self.graph.remove_node(node)?;
        }
        debug!(nodes = added.len(), "pass rolled back");
        Ok(())
    }

    fn purge(&mut self, id: EntityId) -> Result<()> {
        let entity = TrackedNode::Entity(id);
        if self.graph.contains(&entity) {
            let own_checks: Vec<TrackedNode> = self
                .graph
                .dependents(&entity)?
                .iter()
                .filter(|node| matches!(node, TrackedNode::Check(_, owner) if *owner == id))
                .cloned()
                .collect();
            for check in &own_checks {
                self.graph.remove_node(check)?;
            }
            self.graph.remove_node(&entity)?;
        }
        let dropped = self.results.remove_entity(&id);
        debug!(entity = %id, results = dropped.len(), "entity purged");
        Ok(())
    }

    /// Run one checker for one entity and store the result. Returns the
    /// related entities that the previous result did not list.
    fn run_check<E: Identifiable>(
        &mut self,
        checker: &dyn Checker<E>,
        owner: EntityId,
        context: &CheckContext<'_, E>,
        journal: &mut Journal,
    ) -> Result<Vec<EntityId>> {
        let entity = context
            .get(&owner)
            .ok_or(GraphError::UnknownEntity(owner))?;
        let kind = checker.kind();
        let outcome = checker.check(entity, context)?;

        let node = TrackedNode::Check(kind.clone(), owner);
        if self.graph.add_node(node.clone()) {
            journal.added.insert(node.clone());
        }
        if !journal.edges.contains_key(&node) {
            let previous = self.graph.dependencies(&node)?.clone();
            journal.edges.insert(node.clone(), previous);
        }
        journal
            .results
            .entry((kind.clone(), owner))
            .or_insert_with(|| self.results.get(&owner, &kind).cloned());

        let newly_related = self.link(&node, owner, &outcome.related)?;

        let written = self.results.upsert(ResultEntry {
            entity_id: owner,
            check_kind: kind,
            content: outcome.content,
            related: outcome.related,
        });
        debug!(check = %node, written, "result stored");
        Ok(newly_related)
    }

    /// Point `node` at its owner and at every tracked related entity.
    fn link(&mut self, node: &TrackedNode, owner: EntityId, related: &[EntityId]) -> Result<Vec<EntityId>> {
        let previous = self.graph.dependencies(node)?.clone();
        let mut wanted = vec![TrackedNode::Entity(owner)];
        let mut newly_related = Vec::new();

        for &other in related {
            let dependency = TrackedNode::Entity(other);
            if other == owner || !self.graph.contains(&dependency) {
                continue;
            }
            if !previous.contains(&dependency) {
                newly_related.push(other);
            }
            wanted.push(dependency);
        }

        self.graph.set_dependencies(node, wanted)?;
        Ok(newly_related)
    }
}
