//! Bitterness strategy.

use super::fermentables::single_proposal;
use super::solver;
use super::{correction, NoChangeReason, Proposal};
use crate::calculator;
use crate::config::Increments;
use crate::context::RecipeContext;
use crate::model::{IngredientCategory, Usage};
use crate::style::{Metric, StyleTarget};
use crate::Result;

/// Moves the boil addition with the strongest bitterness per gram.
///
/// Whirlpool and dry-hop additions are never touched: they add no
/// bitterness under the Tinseth model. Neither is a boil addition too late
/// to isomerize anything.
pub fn adjust_bittering_agents(
    ctx: &RecipeContext,
    metric: Metric,
    target: &StyleTarget,
    increments: &Increments,
) -> Result<Proposal> {
    let Some(goal) = correction(ctx, metric, target)? else {
        return Ok(Proposal::NoApplicableChange(NoChangeReason::AlreadyInRange));
    };
    let recipe = ctx.recipe();
    let original_gravity = ctx.current_metrics()?.original_gravity;
    let candidates = recipe
        .by_category(IngredientCategory::BitteringAgent)
        .filter(|i| matches!(i.usage, Usage::Boil { .. } | Usage::FirstWort))
        .filter(|i| calculator::ibu_per_gram(i, original_gravity, recipe) > 0.0);
    let ranked = solver::rank(candidates, goal.aim < goal.current, |i| {
        Ok(calculator::ibu_per_gram(i, original_gravity, recipe))
    })?;
    single_proposal(ctx, goal, &ranked, increments.bittering_agent_g, "g", increments)
}
