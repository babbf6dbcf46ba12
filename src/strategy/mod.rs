//! Strategy catalog.
//!
//! A strategy inspects a [`RecipeContext`] and proposes ingredient deltas
//! that move one metric back toward its style range. Strategies never
//! mutate; the engine decides whether and how to apply what they propose.
//!
//! Every strategy aims at the conservative target of
//! [`Range::conservative_target`](crate::style::Range::conservative_target)
//! and moves quantities in whole category increments.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::Increments;
use crate::context::{IngredientDelta, RecipeContext};
use crate::style::{Metric, StyleTarget};
use crate::{Error, Result};

mod bittering;
mod color;
mod fermentables;
mod solver;

use solver::Goal;

pub use bittering::adjust_bittering_agents;
pub use color::adjust_specialty_fermentables;
pub use fermentables::{adjust_base_fermentables, adjust_sugar_adjunct, scale_fermentables};

/// The closed set of strategies a workflow graph may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyId {
    /// Move the largest base fermentable by whole increments.
    AdjustBaseFermentables,
    /// Scale every mash fermentable together, preserving the grain bill's proportions.
    ScaleFermentables,
    /// Move the largest fermentable sugar or adjunct.
    AdjustSugarAdjunct,
    /// Move the boil addition with the most bitterness per gram.
    AdjustBitteringAgents,
    /// Move the darkest specialty fermentable.
    AdjustSpecialtyFermentables,
}

impl StrategyId {
    pub const ALL: [StrategyId; 5] = [
        StrategyId::AdjustBaseFermentables,
        StrategyId::ScaleFermentables,
        StrategyId::AdjustSugarAdjunct,
        StrategyId::AdjustBitteringAgents,
        StrategyId::AdjustSpecialtyFermentables,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyId::AdjustBaseFermentables => "adjust_base_fermentables",
            StrategyId::ScaleFermentables => "scale_fermentables",
            StrategyId::AdjustSugarAdjunct => "adjust_sugar_adjunct",
            StrategyId::AdjustBitteringAgents => "adjust_bittering_agents",
            StrategyId::AdjustSpecialtyFermentables => "adjust_specialty_fermentables",
        }
    }
}

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a strategy could not propose anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoChangeReason {
    /// The metric is already inside its range.
    AlreadyInRange,
    /// The recipe holds no ingredient this strategy may touch.
    NoEligibleIngredient,
    /// The eligible ingredients do not move this metric.
    NoEffect,
    /// The required direction is blocked (nothing left to remove, or the increment cap is zero).
    AtLimit,
    /// Even one increment of every eligible ingredient would carry the metric out the far side of its range.
    IncrementTooCoarse,
}

impl fmt::Display for NoChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            NoChangeReason::AlreadyInRange => "metric already in range",
            NoChangeReason::NoEligibleIngredient => "no eligible ingredient present",
            NoChangeReason::NoEffect => "eligible ingredients do not affect the metric",
            NoChangeReason::AtLimit => "adjustment limit reached",
            NoChangeReason::IncrementTooCoarse => "smallest increment would overshoot the range",
        };
        f.write_str(text)
    }
}

/// A concrete set of deltas and the value they aim for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposedChange {
    pub deltas: Vec<IngredientDelta>,
    /// The conservative target the deltas were sized against.
    pub target_value: f64,
    pub rationale: String,
}

/// What a strategy returns.
#[derive(Debug, Clone, PartialEq)]
pub enum Proposal {
    Change(ProposedChange),
    NoApplicableChange(NoChangeReason),
}

/// Signature shared by every strategy.
pub type StrategyFn = fn(&RecipeContext, Metric, &StyleTarget, &Increments) -> Result<Proposal>;

/// Registry from [`StrategyId`] to the function implementing it.
///
/// # Example
///
/// ```rust
/// use brew_workflow::strategy::{StrategyCatalog, StrategyId};
///
/// let catalog = StrategyCatalog::standard();
/// assert!(catalog.resolve(StrategyId::AdjustBitteringAgents).is_ok());
///
/// let empty = StrategyCatalog::new();
/// assert!(empty.resolve(StrategyId::AdjustBitteringAgents).is_err());
/// ```
#[derive(Clone, Default)]
pub struct StrategyCatalog {
    entries: BTreeMap<StrategyId, StrategyFn>,
}

impl fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

impl StrategyCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog with every built-in strategy registered.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with(StrategyId::AdjustBaseFermentables, adjust_base_fermentables)
            .with(StrategyId::ScaleFermentables, scale_fermentables)
            .with(StrategyId::AdjustSugarAdjunct, adjust_sugar_adjunct)
            .with(StrategyId::AdjustBitteringAgents, adjust_bittering_agents)
            .with(StrategyId::AdjustSpecialtyFermentables, adjust_specialty_fermentables)
    }

    /// Register (or replace) the function behind `id`.
    #[must_use]
    pub fn with(mut self, id: StrategyId, strategy: StrategyFn) -> Self {
        self.entries.insert(id, strategy);
        self
    }

    /// The function registered for `id`, or [`Error::StrategyNotFound`].
    pub fn resolve(&self, id: StrategyId) -> Result<StrategyFn> {
        self.entries
            .get(&id)
            .copied()
            .ok_or(Error::StrategyNotFound(id))
    }

    /// Whether a function is registered for `id`.
    pub fn contains(&self, id: StrategyId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Registered ids in their declaration order.
    pub fn ids(&self) -> impl Iterator<Item = StrategyId> + '_ {
        self.entries.keys().copied()
    }
}

/// What a correction of `metric` has to achieve, or `None` when in range.
pub(crate) fn correction(ctx: &RecipeContext, metric: Metric, target: &StyleTarget) -> Result<Option<Goal>> {
    let current = ctx.current_metrics()?.get(metric);
    let range = target.range(metric);
    Ok(range.conservative_target(current).map(|aim| Goal {
        metric,
        current,
        aim,
        range,
    }))
}
