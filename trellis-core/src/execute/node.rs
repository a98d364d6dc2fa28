//! Executable nodes: a graph node plus the components that build it.

use std::fmt;

use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::warn;

use super::component::Component;
use crate::error::{GraphError, Result};
use crate::graph::NodeKey;

struct Slot {
    component: Box<dyn Component>,
    executed: bool,
}

/// A node whose work is done by an ordered list of owned components.
pub struct ExecutableNode<K: NodeKey> {
    id: K,
    dependencies: IndexSet<K>,
    components: SmallVec<[Slot; 2]>,
}

impl<K: NodeKey> ExecutableNode<K> {
    /// Create a node with no dependencies and no components.
    pub fn new(id: K) -> Self {
        Self {
            id,
            dependencies: IndexSet::new(),
            components: SmallVec::new(),
        }
    }

    /// Builder form of [`add_dependency`](Self::add_dependency).
    pub fn depends_on(mut self, dependency: K) -> Self {
        self.add_dependency(dependency);
        self
    }

    /// Builder form of [`attach`](Self::attach).
    pub fn with_component(mut self, component: impl Component + 'static) -> Self {
        self.attach(component);
        self
    }

    /// Declare that this node consumes `dependency`.
    pub fn add_dependency(&mut self, dependency: K) {
        self.dependencies.insert(dependency);
    }

    /// Attach a component. Components run in attachment order.
    pub fn attach(&mut self, component: impl Component + 'static) {
        self.components.push(Slot {
            component: Box::new(component),
            executed: false,
        });
    }

    pub fn id(&self) -> &K {
        &self.id
    }

    pub fn dependencies(&self) -> &IndexSet<K> {
        &self.dependencies
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    /// Whether the component at `index` has run since the last reset.
    pub fn executed(&self, index: usize) -> Option<bool> {
        self.components.get(index).map(|slot| slot.executed)
    }

    /// Whether every component has run since the last reset.
    pub fn all_executed(&self) -> bool {
        self.components.iter().all(|slot| slot.executed)
    }

    /// Clear every executed flag.
    pub fn reset(&mut self) {
        for slot in &mut self.components {
            slot.executed = false;
        }
    }

    /// Run every component once, in attachment order.
    ///
    /// A failing component does not stop its siblings. Returns true only if
    /// every component succeeded.
    pub fn execute(&mut self) -> bool {
        self.run_components().is_empty()
    }

    /// Like [`execute`](Self::execute), but reports the first failure.
    ///
    /// The error is whatever the component handed over through
    /// [`Component::take_error`], or [`GraphError::ExecutionFailure`].
    pub fn try_execute(&mut self) -> Result<()> {
        match self.run_components().into_iter().next() {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }

    /// Run every component and return one error per failed component.
    pub(crate) fn run_components(&mut self) -> SmallVec<[GraphError; 2]> {
        let mut failed = SmallVec::new();
        for (index, slot) in self.components.iter_mut().enumerate() {
            let ok = slot.component.execute();
            slot.executed = true;
            if !ok {
                warn!(
                    node = %self.id,
                    component = index,
                    name = slot.component.name(),
                    "component failed"
                );
                let err = slot
                    .component
                    .take_error()
                    .unwrap_or_else(|| GraphError::ExecutionFailure {
                        node: self.id.to_string(),
                        component: index,
                    });
                failed.push(err);
            }
        }
        failed
    }
}

impl<K: NodeKey + fmt::Debug> fmt::Debug for ExecutableNode<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self
            .components
            .iter()
            .map(|slot| slot.component.name())
            .collect();
        f.debug_struct("ExecutableNode")
            .field("id", &self.id)
            .field("dependencies", &self.dependencies)
            .field("components", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execute::FnComponent;

    #[test]
    fn execute_runs_every_component_once() {
        let mut node = ExecutableNode::new("Guide")
            .with_component(FnComponent::new("wrap", || true))
            .with_component(FnComponent::new("stitch", || true));

        assert!(!node.all_executed());
        assert!(node.execute());
        assert!(node.all_executed());
        assert_eq!(node.executed(1), Some(true));
        assert_eq!(node.executed(2), None);
    }

    #[test]
    fn failure_does_not_stop_siblings() {
        let mut node = ExecutableNode::new("Guide")
            .with_component(FnComponent::new("union", || false))
            .with_component(FnComponent::new("subtract", || true));

        assert!(!node.execute());
        assert!(node.all_executed());
    }

    #[test]
    fn try_execute_names_failing_component() {
        let mut node = ExecutableNode::new("Flange")
            .with_component(FnComponent::new("ok", || true))
            .with_component(FnComponent::new("remesh", || false));

        assert_eq!(
            node.try_execute(),
            Err(GraphError::ExecutionFailure {
                node: "Flange".into(),
                component: 1,
            })
        );
    }

    #[test]
    fn try_execute_passes_component_error_through() {
        struct Detailed;

        impl Component for Detailed {
            fn execute(&mut self) -> bool {
                false
            }

            fn take_error(&mut self) -> Option<GraphError> {
                Some(GraphError::KernelOperationFailed {
                    operation: "stitch".into(),
                    message: "open boundary".into(),
                })
            }
        }

        let mut node = ExecutableNode::new("Bar").with_component(Detailed);
        assert!(matches!(
            node.try_execute(),
            Err(GraphError::KernelOperationFailed { ref operation, .. }) if operation == "stitch"
        ));
    }

    #[test]
    fn empty_node_succeeds() {
        let mut node = ExecutableNode::new(7u32);
        assert!(node.execute());
        assert!(node.all_executed());
    }

    #[test]
    fn reset_clears_flags() {
        let mut node = ExecutableNode::new("Bone").with_component(FnComponent::new("x", || true));
        node.execute();
        node.reset();
        assert_eq!(node.executed(0), Some(false));
    }
}
