//! Trellis Core
//!
//! This crate provides the build-orchestration and live-update engine behind
//! a surgical-guide design tool. It implements:
//!
//! - A dependency graph with stable topological sort and descendant queries
//! - Execution of component-carrying nodes in dependency order
//! - Entity tracking, checker pipelines and incremental rechecks
//! - Persistence of tracked state through serde codecs
//!
//! Geometry itself is out of scope; the host plugs in its kernel and document
//! store through the traits in [`kernel`].
//!
//! # Architecture
//!
//! - `graph`: dependency graph, topological sort, descendants
//! - `execute`: executable nodes, components and the runner
//! - `live`: entity tracker, checkers, result store, live-update handler
//! - `kernel`: geometry kernel and document store interfaces
//! - `codec`: MessagePack and JSON adapters
//! - `config`: runtime settings
//!
//! # Example
//!
//! ```rust
//! use trellis_core::execute::{BuildPlan, ExecutableNode, FnComponent};
//!
//! let mut plan = BuildPlan::new()
//!     .with(ExecutableNode::new("flange").with_component(FnComponent::new("mesh", || true)))
//!     .with(
//!         ExecutableNode::new("guide")
//!             .depends_on("flange")
//!             .with_component(FnComponent::new("union", || true)),
//!     );
//!
//! let report = plan.execute_all().unwrap();
//! assert_eq!(report.executed, vec!["flange", "guide"]);
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod execute;
pub mod graph;
pub mod kernel;
pub mod live;

pub use codec::{Codec, CodecKind, JsonCodec, MessagePackCodec};
pub use config::TrellisConfig;
pub use error::{GraphError, Result};
pub use graph::{topological_sort, DependencyGraph, NodeKey};
pub use live::{CaseRegistry, LiveUpdateHandler};
