//! Error types for recipe optimization.

use std::time::Duration;

use thiserror::Error;

use crate::engine::graph::NodeId;
use crate::events::{ExecutionStep, NodeVisit};
use crate::stats::RunStats;
use crate::strategy::StrategyId;

/// The main error type for optimization operations.
#[derive(Error, Debug)]
pub enum Error {
    /// An ingredient carries a malformed or negative quantity or attribute.
    #[error("Invalid ingredient data for '{ingredient}': {reason}")]
    InvalidIngredientData {
        /// Identifier of the offending ingredient.
        ingredient: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Batch volume, efficiency or boil duration is out of bounds.
    #[error("Invalid batch parameters: {0}")]
    InvalidBatchParameters(String),

    /// A delta could not be applied to the recipe context.
    #[error("Invalid mutation of '{ingredient}': {reason}")]
    InvalidMutation {
        /// Identifier of the targeted ingredient.
        ingredient: String,
        /// Why the mutation was rejected.
        reason: String,
    },

    /// The workflow references a strategy the catalog does not provide.
    #[error("Strategy '{0}' is not registered in the catalog")]
    StrategyNotFound(StrategyId),

    /// The run visited more nodes than the configured ceiling.
    #[error("Workflow exceeded its budget of {limit} steps")]
    WorkflowBudgetExceeded {
        /// The ceiling that was hit.
        limit: usize,
    },

    /// A transition would move the run back to an earlier phase.
    #[error("Illegal transition from '{from}' (phase {from_phase}) to '{to}' (phase {to_phase})")]
    PhaseRegression {
        /// Node the transition started from.
        from: NodeId,
        /// Phase of the source node.
        from_phase: u32,
        /// Node the transition pointed at.
        to: NodeId,
        /// Phase of the target node.
        to_phase: u32,
    },

    /// The workflow graph is structurally unusable.
    #[error("Invalid workflow graph: {0}")]
    InvalidGraph(String),

    /// A transition referenced a node that does not exist.
    #[error("Unknown workflow node '{0}'")]
    UnknownNode(NodeId),

    /// A style target carries non-finite or inverted ranges.
    #[error("Invalid style target: {0}")]
    InvalidStyleTarget(String),

    /// Engine configuration is unusable.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The host-imposed wall-clock limit elapsed.
    #[error("Optimization timed out after {0:?}")]
    Timeout(Duration),

    /// The run could not be driven to completion by the host runtime.
    #[error("Execution error: {0}")]
    Execution(String),

    /// A JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error while reading configuration or graph files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn ingredient(ingredient: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidIngredientData {
            ingredient: ingredient.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mutation(ingredient: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidMutation {
            ingredient: ingredient.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for optimization operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A fatal error together with everything the run produced before it stopped.
///
/// Hosts can still show how far optimization got: `trace` holds every
/// completed action and `path` every node visited.
#[derive(Error, Debug)]
#[error("optimization run aborted: {error}")]
pub struct RunFailure {
    /// The error that ended the run.
    #[source]
    pub error: Error,
    /// Trace entries recorded before the failure.
    pub trace: Vec<ExecutionStep>,
    /// Nodes visited before the failure.
    pub path: Vec<NodeVisit>,
    /// Counters accumulated before the failure.
    pub stats: RunStats,
}

impl RunFailure {
    /// A failure that happened before any node was visited.
    #[must_use]
    pub fn before_start(error: Error) -> Self {
        let mut stats = RunStats::default();
        stats.record_failure(error.to_string());
        Self {
            error,
            trace: Vec::new(),
            path: Vec::new(),
            stats,
        }
    }
}
