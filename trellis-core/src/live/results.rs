//! Result store and its persisted form.
//!
//! Results live in an arena (`Vec<ResultEntry>`) with a typed index from
//! `(CheckKind, EntityId)` to arena slot, so lookups and overwrites are O(1)
//! and an entry can never be duplicated. A second index lists the kinds stored
//! per entity, so dropping an entity does not scan the arena.

use std::collections::HashMap;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::checker::CheckKind;
use super::entity::{EntityId, EntitySnapshot, Payload};
use crate::codec::Codec;
use crate::error::Result;

/// One check result for one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultEntry {
    pub entity_id: EntityId,
    pub check_kind: CheckKind,
    pub content: Payload,

    /// Entities consulted while producing this result.
    #[serde(default)]
    pub related: Vec<EntityId>,
}

type ResultKey = (CheckKind, EntityId);

/// Arena of result entries with a typed index.
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    entries: Vec<ResultEntry>,
    index: HashMap<ResultKey, usize>,
    by_entity: HashMap<EntityId, IndexSet<CheckKind>>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted entries. A later entry for the same
    /// `(entity, kind)` replaces an earlier one.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = ResultEntry>,
    {
        let mut store = Self::new();
        for entry in entries {
            store.upsert(entry);
        }
        store
    }

    /// Insert or overwrite the entry for `(entry.entity_id, entry.check_kind)`.
    ///
    /// Returns false if an identical entry was already stored, in which case
    /// nothing is written.
    pub fn upsert(&mut self, entry: ResultEntry) -> bool {
        let key = (entry.check_kind.clone(), entry.entity_id);
        match self.index.get(&key) {
            Some(&slot) if self.entries[slot] == entry => false,
            Some(&slot) => {
                self.entries[slot] = entry;
                true
            }
            None => {
                self.by_entity
                    .entry(entry.entity_id)
                    .or_default()
                    .insert(entry.check_kind.clone());
                self.index.insert(key, self.entries.len());
                self.entries.push(entry);
                true
            }
        }
    }

    pub fn get(&self, entity_id: &EntityId, kind: &CheckKind) -> Option<&ResultEntry> {
        self.index
            .get(&(kind.clone(), *entity_id))
            .map(|&slot| &self.entries[slot])
    }

    /// Remove one entry.
    pub fn remove(&mut self, entity_id: &EntityId, kind: &CheckKind) -> Option<ResultEntry> {
        let slot = self.index.remove(&(kind.clone(), *entity_id))?;
        let removed = self.entries.swap_remove(slot);
        if let Some(kinds) = self.by_entity.get_mut(entity_id) {
            kinds.shift_remove(kind);
            if kinds.is_empty() {
                self.by_entity.remove(entity_id);
            }
        }
        if let Some(moved) = self.entries.get(slot) {
            self.index
                .insert((moved.check_kind.clone(), moved.entity_id), slot);
        }
        Some(removed)
    }

    /// Remove every entry of one entity.
    pub fn remove_entity(&mut self, entity_id: &EntityId) -> Vec<ResultEntry> {
        let kinds = self.by_entity.remove(entity_id).unwrap_or_default();
        kinds
            .iter()
            .filter_map(|kind| self.remove(entity_id, kind))
            .collect()
    }

    /// Every entry of one entity, in the order its kinds were first stored.
    pub fn for_entity(&self, entity_id: EntityId) -> impl Iterator<Item = &ResultEntry> + '_ {
        self.by_entity
            .get(&entity_id)
            .into_iter()
            .flatten()
            .filter_map(move |kind| self.get(&entity_id, kind))
    }

    /// All entries in arena order.
    pub fn entries(&self) -> &[ResultEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Persisted state of a live-update handler.
///
/// Equality of two databases ignores list order; use
/// [`is_equivalent`](Self::is_equivalent) or compare [`sorted`](Self::sorted)
/// copies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultDatabase {
    pub latest_snapshots: Vec<EntitySnapshot>,
    pub results: Vec<ResultEntry>,
}

impl ResultDatabase {
    /// Canonical order: snapshots by entity, results by entity then kind.
    pub fn sorted(mut self) -> Self {
        self.latest_snapshots.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        self.results.sort_by(|a, b| {
            (a.entity_id, &a.check_kind).cmp(&(b.entity_id, &b.check_kind))
        });
        self
    }

    /// Order-independent equality.
    pub fn is_equivalent(&self, other: &ResultDatabase) -> bool {
        self.clone().sorted() == other.clone().sorted()
    }

    pub fn to_bytes<C: Codec>(&self, codec: &C) -> Result<Vec<u8>> {
        codec.encode(self)
    }

    pub fn from_bytes<C: Codec>(codec: &C, bytes: &[u8]) -> Result<Self> {
        codec.decode(bytes)
    }
}
