//! Structured execution trace for optimization runs.
//!
//! Every action node that changed the recipe, or that could not, leaves one
//! [`ExecutionStep`] behind. Entries carry a sequence number instead of a
//! wall-clock timestamp, so two runs over the same inputs serialize to the
//! same bytes.

use serde::{Deserialize, Serialize};

use crate::calculator::Metrics;
use crate::context::IngredientDelta;
use crate::engine::graph::NodeId;
use crate::strategy::{NoChangeReason, StrategyId};
use crate::style::Metric;

/// What happened when an action node ran its strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum StepOutcome {
    /// The proposed deltas were applied to the recipe.
    Applied {
        /// Deltas in the order they were applied.
        deltas: Vec<IngredientDelta>,
        /// The conservative target the strategy aimed for.
        target_value: f64,
        /// Human-readable explanation of the change.
        rationale: String,
    },
    /// The strategy could not correct the metric automatically.
    NoApplicableChange {
        /// Why nothing was proposed.
        reason: NoChangeReason,
    },
}

impl StepOutcome {
    /// Returns `true` if the recipe was changed.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, StepOutcome::Applied { .. })
    }
}

/// One entry of the audit trail returned to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionStep {
    /// Position in the trace, starting at zero.
    pub sequence: usize,
    /// Action node that produced the entry.
    pub node: NodeId,
    /// Phase of that node.
    pub phase: u32,
    pub strategy: StrategyId,
    /// Metric the strategy was asked to correct.
    pub metric: Metric,
    pub outcome: StepOutcome,
    /// Metrics recomputed after the step.
    pub metrics: Metrics,
}

/// A node the traversal passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeVisit {
    pub node: NodeId,
    pub phase: u32,
}
