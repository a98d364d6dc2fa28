//! Geometry kernel and document store interfaces.
//!
//! Trellis never does geometry itself. Boolean operations, shrink-wrap and
//! distance queries belong to a native kernel, and entity geometry lives in
//! the host's document. These traits are the seams; [`KernelComponent`]
//! turns a kernel call into a [`Component`] so it can hang off an
//! [`ExecutableNode`](crate::execute::ExecutableNode).

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::error::GraphError;
use crate::execute::Component;

/// A failed kernel or document call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation}: {message}")]
pub struct KernelError {
    pub operation: String,
    pub message: String,
}

impl KernelError {
    pub fn new(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

impl From<KernelError> for GraphError {
    fn from(err: KernelError) -> Self {
        GraphError::KernelOperationFailed {
            operation: err.operation,
            message: err.message,
        }
    }
}

/// Parameters of a shrink-wrap remesh.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShrinkWrapParams {
    /// Edge length of the voxel grid, in millimetres.
    pub resolution: f64,
    /// Signed offset applied to the wrapped surface.
    pub offset: f64,
    pub smoothing_iterations: u32,
    /// Close holes smaller than `resolution` instead of wrapping into them.
    pub fill_holes: bool,
}

impl Default for ShrinkWrapParams {
    fn default() -> Self {
        Self {
            resolution: 0.5,
            offset: 0.0,
            smoothing_iterations: 3,
            fill_holes: true,
        }
    }
}

/// Mesh operations provided by the host's geometry kernel.
pub trait GeometryKernel {
    type Mesh;

    fn union(&self, meshes: &[Self::Mesh]) -> Result<Self::Mesh, KernelError>;

    fn intersect(&self, a: &Self::Mesh, b: &Self::Mesh) -> Result<Self::Mesh, KernelError>;

    /// `target` minus every mesh in `tools`.
    fn subtract(&self, target: &Self::Mesh, tools: &[Self::Mesh]) -> Result<Self::Mesh, KernelError>;

    fn shrink_wrap(
        &self,
        meshes: &[Self::Mesh],
        params: &ShrinkWrapParams,
    ) -> Result<Self::Mesh, KernelError>;

    /// Smallest distance between two meshes; zero or negative when they touch.
    fn distance(&self, a: &Self::Mesh, b: &Self::Mesh) -> Result<f64, KernelError>;
}

/// Entity geometry stored in the host's document.
///
/// `BlockKind` names the kind of building block (guide flange, screw hole,
/// ...), `id` the instance within it.
pub trait DocumentStore {
    type Geometry;
    type BlockKind;
    type Id;

    fn get_entity(&self, kind: &Self::BlockKind, id: &Self::Id) -> Option<Self::Geometry>;

    fn set_entity(
        &mut self,
        kind: &Self::BlockKind,
        id: &Self::Id,
        geometry: Self::Geometry,
    ) -> Result<(), KernelError>;

    fn all_ids(&self, kind: &Self::BlockKind) -> Vec<Self::Id>;

    /// Returns true if something was deleted.
    fn delete_entity(&mut self, id: &Self::Id) -> bool;
}

/// A component that runs one fallible kernel call.
///
/// On failure the [`KernelError`] is kept until the runner collects it
/// through [`Component::take_error`], so the report names the failing
/// kernel operation.
pub struct KernelComponent<F>
where
    F: FnMut() -> Result<(), KernelError> + Send,
{
    name: String,
    run: F,
    last_error: Option<KernelError>,
}

impl<F> KernelComponent<F>
where
    F: FnMut() -> Result<(), KernelError> + Send,
{
    pub fn new(name: impl Into<String>, run: F) -> Self {
        Self {
            name: name.into(),
            run,
            last_error: None,
        }
    }

    pub fn last_error(&self) -> Option<&KernelError> {
        self.last_error.as_ref()
    }
}

impl<F> Component for KernelComponent<F>
where
    F: FnMut() -> Result<(), KernelError> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn execute(&mut self) -> bool {
        match (self.run)() {
            Ok(()) => {
                self.last_error = None;
                true
            }
            Err(err) => {
                warn!(component = %self.name, operation = %err.operation, message = %err.message, "kernel call failed");
                self.last_error = Some(err);
                false
            }
        }
    }

    fn take_error(&mut self) -> Option<GraphError> {
        self.last_error.take().map(GraphError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kernel_error_converts_unchanged() {
        let err: GraphError = KernelError::new("union", "non-manifold input").into();
        assert_eq!(
            err,
            GraphError::KernelOperationFailed {
                operation: "union".into(),
                message: "non-manifold input".into(),
            }
        );
        assert!(!err.is_structural());
    }

    #[test]
    fn component_keeps_failure_until_taken() {
        let mut fail = true;
        let mut component = KernelComponent::new("wrap", move || {
            if std::mem::replace(&mut fail, false) {
                Err(KernelError::new("shrink_wrap", "empty input"))
            } else {
                Ok(())
            }
        });

        assert!(!component.execute());
        assert_eq!(component.last_error().map(|e| e.operation.as_str()), Some("shrink_wrap"));

        assert!(component.execute());
        assert!(component.take_error().is_none());
    }

    #[test]
    fn take_error_clears_it() {
        let mut component =
            KernelComponent::new("distance", || Err(KernelError::new("distance", "no mesh")));
        assert!(!component.execute());
        assert!(matches!(
            component.take_error(),
            Some(GraphError::KernelOperationFailed { .. })
        ));
        assert!(component.take_error().is_none());
    }

    #[test]
    fn shrink_wrap_params_fill_missing_fields() {
        let params: ShrinkWrapParams = serde_json::from_str(r#"{ "offset": 0.2 }"#).unwrap();
        assert_eq!(params.offset, 0.2);
        assert_eq!(params.resolution, ShrinkWrapParams::default().resolution);
    }
}
