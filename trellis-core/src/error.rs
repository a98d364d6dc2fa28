//! Error types for Trellis.
//!
//! Structural errors (`UnknownNode`, `CycleDetected`) abort the requested
//! operation. Execution failures are collected per node by the runner, and
//! kernel failures are passed through with the failing operation's name.

use thiserror::Error;

use crate::live::{CheckKind, EntityId};

/// Result type alias for Trellis operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Main error type for graph, execution and live-update operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// An operation referenced a node id that is not in the graph.
    #[error("unknown node '{0}'")]
    UnknownNode(String),

    /// A sort or traversal found at least one cycle.
    #[error("dependency cycle detected among {} node(s): {}", remaining.len(), remaining.join(", "))]
    CycleDetected { remaining: Vec<String> },

    /// A component's `execute` returned false.
    #[error("component {component} of node '{node}' failed")]
    ExecutionFailure { node: String, component: usize },

    /// A geometry kernel call failed.
    #[error("kernel operation '{operation}' failed: {message}")]
    KernelOperationFailed { operation: String, message: String },

    /// An entity id is not tracked by the live-update handler.
    #[error("entity {0} is not tracked")]
    UnknownEntity(EntityId),

    /// The same entity id appeared twice in one observed state.
    #[error("entity {0} appears more than once in the current state")]
    DuplicateEntity(EntityId),

    /// The checker pipeline has no checker of the requested kind.
    #[error("no checker registered for check kind '{0}'")]
    UnknownCheck(CheckKind),

    /// Encoding or decoding through a codec failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl GraphError {
    pub(crate) fn unknown_node(id: &impl std::fmt::Display) -> Self {
        GraphError::UnknownNode(id.to_string())
    }

    /// Whether this error indicates broken graph structure rather than a
    /// failed piece of work.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            GraphError::UnknownNode(_) | GraphError::CycleDetected { .. }
        )
    }
}

impl From<serde_json::Error> for GraphError {
    fn from(err: serde_json::Error) -> Self {
        GraphError::Codec(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for GraphError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        GraphError::Codec(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for GraphError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        GraphError::Codec(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_names_remaining_nodes() {
        let err = GraphError::CycleDetected {
            remaining: vec!["A".into(), "B".into()],
        };
        assert_eq!(
            err.to_string(),
            "dependency cycle detected among 2 node(s): A, B"
        );
        assert!(err.is_structural());
    }

    #[test]
    fn execution_failure_is_not_structural() {
        let err = GraphError::ExecutionFailure {
            node: "Guide".into(),
            component: 1,
        };
        assert_eq!(err.to_string(), "component 1 of node 'Guide' failed");
        assert!(!err.is_structural());
    }
}
