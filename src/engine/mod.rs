//! The workflow engine.
//!
//! [`Engine::run`] walks a [`WorkflowGraph`] from its start node, evaluates
//! decisions against the live [`RecipeContext`], applies strategy proposals
//! at action nodes and stops at the first end node it reaches.
//!
//! Two rules keep every run bounded:
//!
//! - a transition may never lead to a node with a lower phase index
//!   ([`Error::PhaseRegression`]);
//! - the number of nodes visited may not exceed the configured budget
//!   ([`Error::WorkflowBudgetExceeded`]).
//!
//! # Example
//!
//! ```rust
//! use brew_workflow::engine::{CompletionStatus, Engine};
//! use brew_workflow::model::{Ingredient, IngredientProperties, Recipe, Usage};
//! use brew_workflow::style::{Range, StyleTarget};
//! use brew_workflow::units::Quantity;
//!
//! let recipe = Recipe::new("Thin Pale", 20.0, 75.0, 60.0)
//!     .with_ingredient(Ingredient::new(
//!         "pale",
//!         "Pale Ale Malt",
//!         Quantity::kilograms(3.5),
//!         Usage::Mash,
//!         IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
//!     ))
//!     .with_ingredient(Ingredient::new(
//!         "crystal",
//!         "Crystal 60",
//!         Quantity::kilograms(0.3),
//!         Usage::Mash,
//!         IngredientProperties::SpecialtyFermentable { potential: 1.034, color: 60.0 },
//!     ))
//!     .with_ingredient(Ingredient::new(
//!         "cascade",
//!         "Cascade",
//!         Quantity::grams(28.0),
//!         Usage::Boil { minutes: 60.0 },
//!         IngredientProperties::BitteringAgent { alpha_acid: 10.0 },
//!     ))
//!     .with_ingredient(Ingredient::new(
//!         "us05",
//!         "US-05",
//!         Quantity::packages(1.0),
//!         Usage::Fermentation,
//!         IngredientProperties::BiologicalAgent { attenuation: 75.0 },
//!     ));
//!
//! let target = StyleTarget {
//!     style: "american-pale-ale".into(),
//!     original_gravity: Range::new(1.045, 1.060),
//!     final_gravity: Range::new(1.010, 1.015),
//!     abv: Range::new(4.5, 6.2),
//!     ibu: Range::new(30.0, 50.0),
//!     srm: Range::new(5.0, 10.0),
//! };
//!
//! let outcome = Engine::standard().run(&recipe, &target).unwrap();
//! assert_eq!(outcome.status, CompletionStatus::FullyInRange);
//! assert_eq!(outcome.trace.len(), 1);
//! assert_eq!(recipe.ingredients[0].quantity.amount, 3.5);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::calculator::Metrics;
use crate::config::EngineConfig;
use crate::context::RecipeContext;
use crate::error::RunFailure;
use crate::events::{ExecutionStep, NodeVisit, StepOutcome};
use crate::model::Recipe;
use crate::stats::RunStats;
use crate::strategy::{NoChangeReason, Proposal, StrategyCatalog, StrategyFn};
use crate::style::{Metric, MetricEvaluation, StyleTarget};
use crate::{Error, Result};

pub mod graph;

use graph::{EndKind, NodeId, NodeKind, WorkflowGraph, WorkflowNode};

/// Overall verdict of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionStatus {
    /// Every metric ends in range after at least one change.
    FullyInRange,
    /// Changes were made but some metric is still out of range.
    PartiallyCorrected,
    /// Every metric was in range and nothing was changed.
    NoChangesNeeded,
    /// Some metric is out of range and nothing could be changed.
    Uncorrectable,
}

impl CompletionStatus {
    fn from_validation(all_in_range: bool, changed: bool) -> Self {
        match (all_in_range, changed) {
            (true, true) => CompletionStatus::FullyInRange,
            (true, false) => CompletionStatus::NoChangesNeeded,
            (false, true) => CompletionStatus::PartiallyCorrected,
            (false, false) => CompletionStatus::Uncorrectable,
        }
    }
}

/// Everything a successful run returns.
///
/// Contains no wall-clock data: identical inputs serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunOutcome {
    /// The optimized copy of the caller's recipe.
    pub recipe: Recipe,
    pub trace: Vec<ExecutionStep>,
    pub path: Vec<NodeVisit>,
    pub initial_metrics: Metrics,
    pub final_metrics: Metrics,
    /// Final check of every metric, in [`Metric::ALL`] order.
    pub validation: Vec<MetricEvaluation>,
    /// Metrics that started in range and ended outside it.
    pub drifted: Vec<Metric>,
    pub status: CompletionStatus,
    /// The kind of end node that stopped the run.
    pub end: EndKind,
    pub stats: RunStats,
}

impl RunOutcome {
    /// Returns `true` if any step changed the recipe.
    #[must_use]
    pub fn changed(&self) -> bool {
        self.trace.iter().any(|s| s.outcome.is_applied())
    }
}

/// Outcome of [`Engine::run`].
pub type RunResult = std::result::Result<RunOutcome, RunFailure>;

/// Per-run bookkeeping, handed back to the caller on failure.
#[derive(Default)]
struct Ledger {
    trace: Vec<ExecutionStep>,
    path: Vec<NodeVisit>,
    stats: RunStats,
}

impl Ledger {
    fn fail(mut self, error: Error) -> RunFailure {
        warn!(error = %error, steps = self.trace.len(), "optimization aborted");
        self.stats.record_failure(error.to_string());
        RunFailure {
            error,
            trace: self.trace,
            path: self.path,
            stats: self.stats,
        }
    }
}

/// A graph bound to a strategy catalog and configuration.
///
/// Strategy references are resolved once, in [`Engine::new`]; a run never
/// looks anything up by name.
#[derive(Debug, Clone)]
pub struct Engine {
    graph: WorkflowGraph,
    catalog: StrategyCatalog,
    config: EngineConfig,
    resolved: BTreeMap<NodeId, StrategyFn>,
}

impl Engine {
    pub fn new(graph: WorkflowGraph, catalog: StrategyCatalog, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let mut resolved = BTreeMap::new();
        for node in graph.nodes() {
            if let NodeKind::Action { strategy, .. } = node.kind {
                resolved.insert(node.id.clone(), catalog.resolve(strategy)?);
            }
        }
        Ok(Self {
            graph,
            catalog,
            config,
            resolved,
        })
    }

    /// The built-in graph with every built-in strategy and default configuration.
    ///
    /// # Panics
    ///
    /// Never in practice: the built-in graph only names built-in strategies.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(WorkflowGraph::standard(), StrategyCatalog::standard(), EngineConfig::default())
            .expect("built-in graph references a strategy missing from the built-in catalog")
    }

    /// The graph this engine walks.
    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    /// The catalog strategies were resolved from.
    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    /// The configuration runs use.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The most nodes a single run may visit.
    #[must_use]
    pub fn max_steps(&self) -> usize {
        self.config.step_budget(self.graph.len())
    }

    /// Optimizes a copy of `recipe` toward `target`.
    ///
    /// The caller's recipe is never modified. Inputs are validated before
    /// the first node is visited.
    pub fn run(&self, recipe: &Recipe, target: &StyleTarget) -> RunResult {
        let span = info_span!("optimize", recipe = %recipe.name, style = %target.style);
        let _enter = span.enter();

        target.validate().map_err(RunFailure::before_start)?;
        let mut ctx = RecipeContext::new(recipe).map_err(RunFailure::before_start)?;
        let initial_metrics = ctx.current_metrics().map_err(RunFailure::before_start)?;

        let mut ledger = Ledger::default();
        let end = match self.traverse(&mut ctx, target, &mut ledger) {
            Ok(end) => end,
            Err(error) => return Err(ledger.fail(error)),
        };
        let final_metrics = match ctx.current_metrics() {
            Ok(metrics) => metrics,
            Err(error) => return Err(ledger.fail(error)),
        };

        let validation = target.evaluate_all(&final_metrics);
        let drifted: Vec<Metric> = validation
            .iter()
            .filter(|e| !e.in_range && target.range(e.metric).contains(initial_metrics.get(e.metric)))
            .map(|e| e.metric)
            .collect();
        for metric in &drifted {
            warn!(%metric, "metric drifted out of range");
        }

        let changed = ledger.trace.iter().any(|s| s.outcome.is_applied());
        let all_in_range = validation.iter().all(|e| e.in_range);
        let status = CompletionStatus::from_validation(all_in_range, changed);
        info!(?status, ?end, steps = ledger.trace.len(), "optimization finished");

        Ok(RunOutcome {
            recipe: ctx.into_recipe(),
            trace: ledger.trace,
            path: ledger.path,
            initial_metrics,
            final_metrics,
            validation,
            drifted,
            status,
            end,
            stats: ledger.stats,
        })
    }

    fn traverse(
        &self,
        ctx: &mut RecipeContext,
        target: &StyleTarget,
        ledger: &mut Ledger,
    ) -> Result<EndKind> {
        let budget = self.max_steps();
        let mut current = self.graph.start().clone();

        loop {
            if ledger.stats.nodes_visited >= budget {
                return Err(Error::WorkflowBudgetExceeded { limit: budget });
            }
            let node = self.graph.node(&current)?;
            ledger.stats.record_visit();
            ledger.path.push(NodeVisit {
                node: node.id.clone(),
                phase: node.phase,
            });
            debug!(node = %node.id, phase = node.phase, "visiting node");

            let next = match &node.kind {
                NodeKind::Start { next } => next.clone(),
                NodeKind::Decision {
                    condition,
                    when_true,
                    when_false,
                } => {
                    if condition.holds(&ctx.current_metrics()?, target) {
                        when_true.clone()
                    } else {
                        when_false.clone()
                    }
                }
                NodeKind::MultiDecision { gate } => gate.route(&ctx.current_metrics()?, target).clone(),
                NodeKind::Action { .. } => self.act(node, ctx, target, ledger)?,
                NodeKind::End { outcome } => return Ok(*outcome),
            };

            let to = self.graph.node(&next)?;
            if to.phase < node.phase {
                return Err(Error::PhaseRegression {
                    from: node.id.clone(),
                    from_phase: node.phase,
                    to: to.id.clone(),
                    to_phase: to.phase,
                });
            }
            current = next;
        }
    }

    /// Runs an action node and returns the node to move to.
    fn act(
        &self,
        node: &WorkflowNode,
        ctx: &mut RecipeContext,
        target: &StyleTarget,
        ledger: &mut Ledger,
    ) -> Result<NodeId> {
        let NodeKind::Action {
            strategy,
            metric,
            next,
            on_no_change,
        } = &node.kind
        else {
            return Err(Error::Execution(format!("node '{}' is not an action", node.id)));
        };
        let apply = self
            .resolved
            .get(&node.id)
            .copied()
            .ok_or(Error::StrategyNotFound(*strategy))?;

        let outcome = match apply(ctx, *metric, target, &self.config.increments)? {
            Proposal::Change(change) => {
                let snapshot = ctx.snapshot();
                if let Err(error) = ctx.apply_all(&change.deltas) {
                    ctx.restore(snapshot);
                    ledger.stats.record_rollback();
                    return Err(error);
                }
                ledger.stats.record_applied(change.deltas.len());
                info!(node = %node.id, %strategy, %metric, rationale = %change.rationale, "applied change");
                StepOutcome::Applied {
                    deltas: change.deltas,
                    target_value: change.target_value,
                    rationale: change.rationale,
                }
            }
            Proposal::NoApplicableChange(NoChangeReason::AlreadyInRange) => {
                debug!(node = %node.id, %metric, "metric already in range");
                return Ok(next.clone());
            }
            Proposal::NoApplicableChange(reason) => {
                ledger.stats.record_unresolved();
                warn!(node = %node.id, %strategy, %metric, %reason, "no applicable change");
                StepOutcome::NoApplicableChange { reason }
            }
        };

        let route = match (&outcome, on_no_change) {
            (StepOutcome::NoApplicableChange { .. }, Some(fallback)) => fallback.clone(),
            _ => next.clone(),
        };
        ledger.trace.push(ExecutionStep {
            sequence: ledger.trace.len(),
            node: node.id.clone(),
            phase: node.phase,
            strategy: *strategy,
            metric: *metric,
            outcome,
            metrics: ctx.current_metrics()?,
        });
        Ok(route)
    }
}
