//! Host-facing wrapper that runs the engine on the async runtime.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engine::{Engine, RunResult};
use crate::error::RunFailure;
use crate::model::Recipe;
use crate::style::StyleTarget;
use crate::Error;

/// One recipe and the style it should be moved into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub recipe: Recipe,
    pub target: StyleTarget,
}

impl OptimizationRequest {
    pub fn new(recipe: Recipe, target: StyleTarget) -> Self {
        Self { recipe, target }
    }
}

/// Runs optimization requests without blocking the async executor.
///
/// A run is pure CPU work, so each one is moved onto a blocking task. The
/// engine is shared behind an [`Arc`]; every run still gets its own recipe
/// context and trace.
///
/// # Example
///
/// ```rust
/// use brew_workflow::{OptimizationRequest, OptimizationWorkflow};
/// use brew_workflow::model::{Ingredient, IngredientProperties, Recipe, Usage};
/// use brew_workflow::style::{Range, StyleTarget};
/// use brew_workflow::units::Quantity;
///
/// # tokio_test::block_on(async {
/// let recipe = Recipe::new("SMaSH", 20.0, 75.0, 60.0).with_ingredient(Ingredient::new(
///     "pale",
///     "Pale Ale Malt",
///     Quantity::kilograms(4.5),
///     Usage::Mash,
///     IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
/// ));
/// let target = StyleTarget {
///     style: "american-pale-ale".into(),
///     original_gravity: Range::new(1.045, 1.060),
///     final_gravity: Range::new(1.010, 1.015),
///     abv: Range::new(4.5, 6.2),
///     ibu: Range::new(30.0, 50.0),
///     srm: Range::new(5.0, 10.0),
/// };
///
/// let workflow = OptimizationWorkflow::standard().with_name("apa");
/// let outcome = workflow.run(OptimizationRequest::new(recipe, target)).await.unwrap();
/// assert!(!outcome.trace.is_empty());
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct OptimizationWorkflow {
    engine: Arc<Engine>,
    name: String,
    timeout: Option<Duration>,
}

impl OptimizationWorkflow {
    /// Wrap `engine`, taking the timeout from its configuration.
    pub fn new(engine: Engine) -> Self {
        let timeout = engine.config().timeout();
        Self {
            engine: Arc::new(engine),
            name: "optimization".to_string(),
            timeout,
        }
    }

    /// A workflow around [`Engine::standard`].
    pub fn standard() -> Self {
        Self::new(Engine::standard())
    }

    /// Set a human-readable name for this workflow.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Override the wall-clock limit applied around each run.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Returns the name of this workflow.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Run one request to completion.
    ///
    /// Fails with [`Error::Timeout`] if the configured limit elapses and with
    /// [`Error::Execution`] if the blocking task cannot be joined.
    pub async fn run(&self, request: OptimizationRequest) -> RunResult {
        debug!(workflow = %self.name, recipe = %request.recipe.name, "dispatching run");
        let engine = Arc::clone(&self.engine);
        let task = tokio::task::spawn_blocking(move || engine.run(&request.recipe, &request.target));

        let joined = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, task).await {
                Ok(joined) => joined,
                Err(_) => return Err(RunFailure::before_start(Error::Timeout(limit))),
            },
            None => task.await,
        };
        joined.map_err(|e| RunFailure::before_start(Error::Execution(e.to_string())))?
    }
}
