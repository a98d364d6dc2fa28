//! Checker pipeline: pluggable validation routines run per entity.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::entity::{EntityId, Identifiable, Payload};
use crate::error::Result;

/// The kind of validation a checker performs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CheckKind {
    /// Too close to another entity of the same case.
    Vicinity,
    /// Intersects another entity or a building block.
    Intersection,
    /// Conflicts with anatomy (bone thickness, nerves, ...).
    Anatomy,
    Custom(String),
}

impl fmt::Display for CheckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckKind::Vicinity => f.write_str("vicinity"),
            CheckKind::Intersection => f.write_str("intersection"),
            CheckKind::Anatomy => f.write_str("anatomy"),
            CheckKind::Custom(name) => f.write_str(name),
        }
    }
}

/// What one checker produced for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckOutcome {
    pub content: Payload,

    /// Other entities this result was computed from. When one of them
    /// changes, this result is rechecked.
    pub related: Vec<EntityId>,
}

impl CheckOutcome {
    pub fn new(content: Payload) -> Self {
        Self {
            content,
            related: Vec::new(),
        }
    }

    /// Serialize `record` as the result content.
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self> {
        Ok(Self::new(serde_json::to_value(record)?))
    }

    pub fn with_related(mut self, related: impl IntoIterator<Item = EntityId>) -> Self {
        self.related.extend(related);
        self
    }
}

/// Read access to every entity of the current state.
pub struct CheckContext<'a, E> {
    entities: IndexMap<EntityId, &'a E>,
}

impl<'a, E: Identifiable> CheckContext<'a, E> {
    pub fn new(current: &'a [E]) -> Self {
        Self {
            entities: current
                .iter()
                .map(|entity| (entity.entity_id(), entity))
                .collect(),
        }
    }

    pub fn get(&self, id: &EntityId) -> Option<&'a E> {
        self.entities.get(id).copied()
    }

    /// Every entity, in observed order.
    pub fn entities(&self) -> impl Iterator<Item = &'a E> + '_ {
        self.entities.values().copied()
    }

    /// Every entity except `id`.
    pub fn others(&self, id: EntityId) -> impl Iterator<Item = &'a E> + '_ {
        self.entities
            .iter()
            .filter(move |(other, _)| **other != id)
            .map(|(_, entity)| *entity)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// A validation routine producing one result per entity.
pub trait Checker<E>: Send + Sync {
    fn kind(&self) -> CheckKind;

    fn check(&self, entity: &E, context: &CheckContext<'_, E>) -> Result<CheckOutcome>;
}

/// Ordered collection of checkers, at most one per kind.
pub struct CheckerPipeline<E> {
    checkers: Vec<Box<dyn Checker<E>>>,
}

impl<E> CheckerPipeline<E> {
    pub fn new() -> Self {
        Self {
            checkers: Vec::new(),
        }
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, checker: impl Checker<E> + 'static) -> Self {
        self.push(checker);
        self
    }

    /// Add a checker, replacing any existing checker of the same kind.
    pub fn push(&mut self, checker: impl Checker<E> + 'static) {
        let kind = checker.kind();
        match self.checkers.iter().position(|existing| existing.kind() == kind) {
            Some(index) => self.checkers[index] = Box::new(checker),
            None => self.checkers.push(Box::new(checker)),
        }
    }

    pub fn get(&self, kind: &CheckKind) -> Option<&dyn Checker<E>> {
        self.checkers
            .iter()
            .find(|checker| checker.kind() == *kind)
            .map(|checker| checker.as_ref())
    }

    pub fn kinds(&self) -> Vec<CheckKind> {
        self.checkers.iter().map(|checker| checker.kind()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Checker<E>> + '_ {
        self.checkers.iter().map(|checker| checker.as_ref())
    }

    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }
}

impl<E> Default for CheckerPipeline<E> {
    fn default() -> Self {
        Self::new()
    }
}
