//! # brew-workflow
//!
//! Deterministic recipe optimization for brewers.
//!
//! Given a recipe and the ranges of a target style, the engine recomputes
//! five metrics (OG, FG, ABV, IBU and SRM), walks a phase-gated graph of
//! decision and action nodes, and applies conservative, whole-increment
//! ingredient changes until it reaches an end node.
//!
//! ## Core Concepts
//!
//! - **calculator**: pure metric formulas (Tinseth bitterness, Morey color)
//! - **RecipeContext**: the only mutable surface a run touches
//! - **StrategyCatalog**: typed registry of pure mutation strategies
//! - **WorkflowGraph**: tagged node graph with phase indices
//! - **Engine**: one forward pass over the graph, with a step budget
//! - **OptimizationWorkflow**: async wrapper that runs the engine off the executor
//! - **ParallelOptimizer**: concurrent fan-out over many requests
//!
//! ## Example
//!
//! ```rust
//! use brew_workflow::{CompletionStatus, OptimizationRequest, OptimizationWorkflow, Optimize};
//! use brew_workflow::model::{Ingredient, IngredientProperties, Recipe, Usage};
//! use brew_workflow::style::{Range, StyleTarget};
//! use brew_workflow::units::Quantity;
//!
//! # tokio_test::block_on(async {
//! let recipe = Recipe::new("House Pale", 20.0, 75.0, 60.0)
//!     .with_ingredient(Ingredient::new(
//!         "pale",
//!         "Pale Ale Malt",
//!         Quantity::kilograms(4.0),
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
//! let workflow = OptimizationWorkflow::standard();
//! let outcome = workflow
//!     .optimize(OptimizationRequest::new(recipe, target))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(outcome.status, CompletionStatus::NoChangesNeeded);
//! assert!(outcome.trace.is_empty());
//! # });
//! ```

pub mod calculator;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod events;
pub mod model;
pub mod optimize;
pub mod stats;
pub mod strategy;
pub mod style;
pub mod units;
pub mod workflow;

pub use calculator::{calculate, Metrics};
pub use config::{EngineConfig, Increments};
pub use context::{Change, IngredientDelta, RecipeContext, RecipeSnapshot};
pub use engine::graph::{Condition, EndKind, Gate, NodeId, NodeKind, Route, WorkflowGraph, WorkflowNode};
pub use engine::{CompletionStatus, Engine, RunOutcome, RunResult};
pub use error::{Error, Result, RunFailure};
pub use events::{ExecutionStep, NodeVisit, StepOutcome};
pub use model::{Ingredient, IngredientCategory, IngredientId, IngredientProperties, Recipe, Usage};
pub use optimize::parallel::{ParallelOptimizer, ParallelOptimizerBuilder};
pub use optimize::Optimize;
pub use stats::RunStats;
pub use strategy::{NoChangeReason, Proposal, ProposedChange, StrategyCatalog, StrategyFn, StrategyId};
pub use style::{Metric, MetricEvaluation, Position, Range, StyleTarget};
pub use units::{Quantity, Unit};
pub use workflow::{OptimizationRequest, OptimizationWorkflow};
