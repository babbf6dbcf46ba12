//! Color strategy.

use super::fermentables::single_proposal;
use super::solver;
use super::{correction, NoChangeReason, Proposal};
use crate::config::Increments;
use crate::context::RecipeContext;
use crate::model::IngredientCategory;
use crate::style::{Metric, StyleTarget};
use crate::Result;

/// Moves the darkest specialty fermentable by whole increments.
///
/// The darkest grain moves color furthest per increment, so it disturbs
/// gravity the least for a given color change. When one increment of it
/// would pass the target, lighter grains are tried in turn.
pub fn adjust_specialty_fermentables(
    ctx: &RecipeContext,
    metric: Metric,
    target: &StyleTarget,
    increments: &Increments,
) -> Result<Proposal> {
    let Some(goal) = correction(ctx, metric, target)? else {
        return Ok(Proposal::NoApplicableChange(NoChangeReason::AlreadyInRange));
    };
    let candidates = ctx
        .recipe()
        .by_category(IngredientCategory::SpecialtyFermentable);
    let darkest_first =
        solver::rank(candidates, goal.aim < goal.current, |i| Ok(i.properties.color()))?;
    single_proposal(
        ctx,
        goal,
        &darkest_first,
        increments.specialty_fermentable_kg,
        "kg",
        increments,
    )
}
