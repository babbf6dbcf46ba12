//! Gravity-side strategies: base malt, whole-grist scaling and sugars.

use tracing::trace;

use super::solver::{self, Fit, Goal, Limits, Solved};
use super::{correction, NoChangeReason, Proposal, ProposedChange};
use crate::config::Increments;
use crate::context::{Change, IngredientDelta, RecipeContext};
use crate::model::{Ingredient, IngredientCategory};
use crate::style::{Metric, StyleTarget};
use crate::Result;

/// Keeps whole-increment scaling away from a factor of zero.
const SCALE_FLOOR_TOLERANCE: f64 = 1e-9;

/// Moves the largest base fermentable by whole increments.
///
/// When one increment of the largest would pass the target, the next
/// largest is tried.
pub fn adjust_base_fermentables(
    ctx: &RecipeContext,
    metric: Metric,
    target: &StyleTarget,
    increments: &Increments,
) -> Result<Proposal> {
    let Some(goal) = correction(ctx, metric, target)? else {
        return Ok(Proposal::NoApplicableChange(NoChangeReason::AlreadyInRange));
    };
    let candidates = ctx.recipe().by_category(IngredientCategory::BaseFermentable);
    let ranked = solver::rank(candidates, goal.aim < goal.current, Ingredient::canonical_amount)?;
    single_proposal(ctx, goal, &ranked, increments.base_fermentable_kg, "kg", increments)
}

/// Moves the largest fermentable sugar or adjunct by whole increments.
///
/// Sugars raise gravity and alcohol without adding color, which makes them
/// the first choice for alcohol corrections.
pub fn adjust_sugar_adjunct(
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
        .by_category(IngredientCategory::Other)
        .filter(|i| i.properties.potential().is_some());
    let ranked = solver::rank(candidates, goal.aim < goal.current, Ingredient::canonical_amount)?;
    single_proposal(ctx, goal, &ranked, increments.sugar_adjunct_g, "g", increments)
}

/// Scales every mash fermentable by whole multiples of `scale_step`.
///
/// Each ingredient's change is rounded to its own category increment, so
/// small specialty additions may stay put while the base malt moves.
pub fn scale_fermentables(
    ctx: &RecipeContext,
    metric: Metric,
    target: &StyleTarget,
    increments: &Increments,
) -> Result<Proposal> {
    let Some(goal) = correction(ctx, metric, target)? else {
        return Ok(Proposal::NoApplicableChange(NoChangeReason::AlreadyInRange));
    };

    let mut grist = Vec::new();
    for ingredient in &ctx.recipe().ingredients {
        let category = ingredient.category();
        if !category.is_mashed() {
            continue;
        }
        let held = ingredient.canonical_amount()?;
        if held <= 0.0 {
            continue;
        }
        if let Some(step) = increments.for_category(category) {
            grist.push((ingredient.id.clone(), held, step));
        }
    }
    if grist.is_empty() {
        return Ok(Proposal::NoApplicableChange(NoChangeReason::NoEligibleIngredient));
    }

    let scale_step = increments.scale_step;
    let down = ((1.0 - SCALE_FLOOR_TOLERANCE) / scale_step).floor() as u32;
    let limits = Limits {
        up: increments.max_per_proposal,
        down: down.min(increments.max_per_proposal),
    };
    let solved = solver::solve(ctx, goal, limits, |units| {
        let fraction = units as f64 * scale_step;
        grist
            .iter()
            .filter_map(|(id, held, step)| {
                let change = solver::round_to_step(held * fraction, *step).max(-held);
                (change != 0.0).then(|| IngredientDelta::adjust(id.clone(), change))
            })
            .collect()
    })?;

    Ok(match solved {
        Solved::Planned { units, deltas, .. } => {
            let percent = units as f64 * scale_step * 100.0;
            trace!(%metric, units, "scaled grist");
            Proposal::Change(ProposedChange {
                rationale: format!(
                    "scale mash fermentables by {percent:+.0}% to move {metric} from {:.4} toward {:.4}",
                    goal.current, goal.aim
                ),
                deltas,
                target_value: goal.aim,
            })
        }
        Solved::Blocked(reason) => Proposal::NoApplicableChange(reason),
    })
}

/// Sizes a change on the first ranked candidate that fits and words it as a proposal.
pub(super) fn single_proposal(
    ctx: &RecipeContext,
    goal: Goal,
    ranked: &[&Ingredient],
    step: f64,
    unit: &str,
    increments: &Increments,
) -> Result<Proposal> {
    let Some((ingredient, solved)) = solver::first_fit(ctx, goal, ranked, step, increments.max_per_proposal)?
    else {
        return Ok(Proposal::NoApplicableChange(NoChangeReason::NoEligibleIngredient));
    };
    Ok(match solved {
        Solved::Planned { units, deltas, fit } => {
            let verb = if units > 0 { "raise" } else { "lower" };
            let amount: f64 = deltas
                .iter()
                .map(|d| match d.change {
                    Change::Adjust { amount } => amount.abs(),
                    _ => 0.0,
                })
                .sum();
            trace!(ingredient = %ingredient.id, units, ?fit, "sized adjustment");
            let mut rationale = format!(
                "{verb} {} by {amount} {unit} ({} x {step} {unit}) to move {} from {:.4} toward {:.4}",
                ingredient.name,
                units.unsigned_abs(),
                goal.metric,
                goal.current,
                goal.aim,
            );
            if fit == Fit::PastAim {
                rationale.push_str("; the smallest increment passes the target but stays in range");
            }
            Proposal::Change(ProposedChange {
                rationale,
                deltas,
                target_value: goal.aim,
            })
        }
        Solved::Blocked(reason) => Proposal::NoApplicableChange(reason),
    })
}
