//! Entity identity and snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

/// Opaque serializable record: snapshot payloads and check results.
pub type Payload = serde_json::Value;

/// Stable identifier of a tracked entity (a screw, a guide, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generate a new random entity ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Deterministic ID from a number, mostly for fixtures.
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for EntityId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Human-facing composite key of an entity within its case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LogicalKey {
    pub case_number: u32,
    pub index: u32,
}

impl LogicalKey {
    pub fn new(case_number: u32, index: u32) -> Self {
        Self { case_number, index }
    }
}

impl fmt::Display for LogicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.case_number, self.index)
    }
}

/// Something the tracker can follow across edits.
///
/// The snapshot payload is the entity's own serialized form, so any change to
/// a serialized field (however small) counts as a change.
pub trait Identifiable: Serialize {
    fn entity_id(&self) -> EntityId;

    fn logical_key(&self) -> LogicalKey;

    fn payload(&self) -> Result<Payload> {
        Ok(serde_json::to_value(self)?)
    }
}

/// Serializable copy of an entity at one point in time.
///
/// Snapshots are replaced whole, never edited in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub entity_id: EntityId,
    pub key: LogicalKey,
    pub payload: Payload,
}

impl EntitySnapshot {
    /// Capture the current state of `entity`.
    pub fn capture<E: Identifiable>(entity: &E) -> Result<Self> {
        Ok(Self {
            entity_id: entity.entity_id(),
            key: entity.logical_key(),
            payload: entity.payload()?,
        })
    }

    /// Whether `other` describes the same content. Floats compare exactly.
    pub fn same_content(&self, other: &EntitySnapshot) -> bool {
        self.key == other.key && self.payload == other.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Screw {
        id: EntityId,
        index: u32,
        tip: [f64; 3],
    }

    impl Identifiable for Screw {
        fn entity_id(&self) -> EntityId {
            self.id
        }

        fn logical_key(&self) -> LogicalKey {
            LogicalKey::new(1, self.index)
        }
    }

    #[test]
    fn ids_are_unique_and_display_as_uuid() {
        let a = EntityId::new();
        let b = EntityId::new();
        assert_ne!(a, b);
        assert_eq!(
            EntityId::from_u128(1).to_string(),
            "00000000-0000-0000-0000-000000000001"
        );
    }

    #[test]
    fn snapshot_detects_tiny_float_drift() {
        let id = EntityId::from_u128(7);
        let before = EntitySnapshot::capture(&Screw { id, index: 1, tip: [1.0, 2.0, 3.0] }).unwrap();
        let same = EntitySnapshot::capture(&Screw { id, index: 1, tip: [1.0, 2.0, 3.0] }).unwrap();
        let drifted =
            EntitySnapshot::capture(&Screw { id, index: 1, tip: [1.0, 2.0, 3.0 + 1e-12] }).unwrap();

        assert!(before.same_content(&same));
        assert!(!before.same_content(&drifted));
        assert_eq!(before.key.to_string(), "1.1");
    }
}
