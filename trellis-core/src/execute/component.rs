//! Components attached to executable nodes.

use crate::error::GraphError;

/// A unit of work attached to an [`ExecutableNode`](super::ExecutableNode).
///
/// Each component is owned by exactly one node. `execute` reports success as
/// a plain bool; a component that knows more about its failure hands it over
/// through [`take_error`](Self::take_error) (see
/// [`KernelComponent`](crate::kernel::KernelComponent)).
pub trait Component: Send {
    /// Human-readable name, used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Run the component. Returns true on success.
    fn execute(&mut self) -> bool;

    /// Detail of the last failure, if the component kept any.
    fn take_error(&mut self) -> Option<GraphError> {
        None
    }
}

/// A component backed by a closure.
pub struct FnComponent<F>
where
    F: FnMut() -> bool + Send,
{
    name: String,
    run: F,
}

impl<F> FnComponent<F>
where
    F: FnMut() -> bool + Send,
{
    /// Create a named closure component.
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
        }
    }
}

impl<F> Component for FnComponent<F>
where
    F: FnMut() -> bool + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> bool {
        (self.run)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Always(bool);

    impl Component for Always {
        fn execute(&mut self) -> bool {
            self.0
        }
    }

    #[test]
    fn closure_component_runs_its_closure() {
        let mut calls = 0;
        let mut component = FnComponent::new("count", || {
            calls += 1;
            true
        });
        assert_eq!(component.name(), "count");
        assert!(component.execute());
        assert!(component.execute());
        drop(component);
        assert_eq!(calls, 2);
    }

    #[test]
    fn default_name_is_the_type_name() {
        let component = Always(false);
        assert!(component.name().ends_with("Always"));
    }
}
