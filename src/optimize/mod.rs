//! The [`Optimize`] trait and concurrent fan-out.
//!
//! Hosts program against [`Optimize`] rather than a concrete workflow, so a
//! test double or a remote optimizer can stand in for the local engine.

use async_trait::async_trait;

use crate::engine::RunResult;
use crate::workflow::{OptimizationRequest, OptimizationWorkflow};

pub mod parallel;

/// Anything that can turn an [`OptimizationRequest`] into a run result.
///
/// # Example
///
/// ```rust
/// use brew_workflow::{Optimize, OptimizationWorkflow};
///
/// fn describe(optimizer: &dyn Optimize) -> String {
///     format!("using {}", optimizer.name())
/// }
///
/// let workflow = OptimizationWorkflow::standard().with_name("house");
/// assert_eq!(describe(&workflow), "using house");
/// ```
#[async_trait]
pub trait Optimize: Send + Sync {
    /// Optimize one recipe.
    async fn optimize(&self, request: OptimizationRequest) -> RunResult;

    /// Returns a human-readable name. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

#[async_trait]
impl Optimize for OptimizationWorkflow {
    async fn optimize(&self, request: OptimizationRequest) -> RunResult {
        self.run(request).await
    }

    fn name(&self) -> &str {
        OptimizationWorkflow::name(self)
    }
}

#[async_trait]
impl<O> Optimize for Box<O>
where
    O: Optimize + ?Sized,
{
    async fn optimize(&self, request: OptimizationRequest) -> RunResult {
        (**self).optimize(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
