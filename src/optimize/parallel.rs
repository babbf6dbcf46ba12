//! Concurrent optimization of many requests.

use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use super::Optimize;
use crate::engine::RunResult;
use crate::workflow::OptimizationRequest;

/// Applies one optimizer to a batch of requests concurrently.
///
/// Runs are independent: a failure in one does not affect the others, and
/// results come back in request order.
pub struct ParallelOptimizer<O> {
    optimizer: Arc<O>,
}

impl<O: Optimize + 'static> ParallelOptimizer<O> {
    /// Create a parallel optimizer wrapping `optimizer`.
    pub fn new(optimizer: O) -> Self {
        Self {
            optimizer: Arc::new(optimizer),
        }
    }

    /// Access the inner optimizer.
    pub fn inner(&self) -> &O {
        &self.optimizer
    }

    /// Optimize every request, returning one result per request.
    pub async fn optimize_all(&self, requests: Vec<OptimizationRequest>) -> Vec<RunResult> {
        let count = requests.len();
        let futures = requests.into_iter().map(|request| {
            let optimizer = Arc::clone(&self.optimizer);
            async move { optimizer.optimize(request).await }
        });

        let results = join_all(futures).await;
        let failed = results.iter().filter(|r| r.is_err()).count();
        info!(optimizer = self.optimizer.name(), count, failed, "batch optimized");
        results
    }
}

/// Builder for configuring and constructing a [`ParallelOptimizer`].
///
/// # Example
///
/// ```rust
/// use brew_workflow::OptimizationWorkflow;
/// use brew_workflow::optimize::parallel::ParallelOptimizerBuilder;
///
/// # tokio_test::block_on(async {
/// let parallel = ParallelOptimizerBuilder::new(OptimizationWorkflow::standard()).build();
/// assert!(parallel.optimize_all(Vec::new()).await.is_empty());
/// # });
/// ```
pub struct ParallelOptimizerBuilder<O> {
    optimizer: O,
}

impl<O: Optimize + 'static> ParallelOptimizerBuilder<O> {
    /// Create a builder for the given optimizer.
    pub fn new(optimizer: O) -> Self {
        Self { optimizer }
    }

    /// Build the [`ParallelOptimizer`].
    pub fn build(self) -> ParallelOptimizer<O> {
        ParallelOptimizer::new(self.optimizer)
    }
}
