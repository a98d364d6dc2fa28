//! Live Updates
//!
//! This module keeps validation results in step with a set of edited
//! entities without re-running every check after every edit.
//!
//! # Concepts
//!
//! ## Entities and snapshots
//!
//! Anything implementing [`Identifiable`] can be tracked. Its serialized form
//! is the snapshot payload, so "changed" means "serializes differently".
//!
//! ## Checkers
//!
//! A [`Checker`] produces one result per entity for one [`CheckKind`]. Besides
//! the content, a result names the other entities it was computed from; those
//! links are what lets an edit to one screw recheck its neighbours.
//!
//! ## Handler
//!
//! [`LiveUpdateHandler`] owns snapshots, results and the cascade graph for one
//! case. [`CaseRegistry`] holds one handler per open case.
//!
//! # Implementation Notes
//!
//! The cascade graph is a [`DependencyGraph`](crate::graph::DependencyGraph)
//! over [`TrackedNode`]s, so staleness is just a descendant query.

mod checker;
mod entity;
mod handler;
mod registry;
mod results;
mod tracker;

pub use checker::{CheckContext, CheckKind, CheckOutcome, Checker, CheckerPipeline};
pub use entity::{EntityId, EntitySnapshot, Identifiable, LogicalKey, Payload};
pub use handler::{LiveUpdateHandler, TrackedNode, UpdateSummary};
pub use registry::{CaseRegistry, SharedHandler};
pub use results::{ResultDatabase, ResultEntry, ResultStore};
pub use tracker::{EntityDiff, EntityTracker};
