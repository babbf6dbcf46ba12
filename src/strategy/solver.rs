//! Whole-increment sizing shared by the strategies.
//!
//! The metric's response to one increment is probed with
//! [`RecipeContext::preview`]; the increment count is the floor of
//! `needed / response` (at most the cap) and is then walked back while a
//! preview would carry the metric past its target. A single increment that
//! still passes the target is kept only if it lands inside the range, and
//! only as a last resort across candidates.

use crate::context::{IngredientDelta, RecipeContext};
use crate::model::Ingredient;
use crate::strategy::NoChangeReason;
use crate::style::{Metric, Range};
use crate::Result;

/// Responses smaller than this count as "does not move the metric".
const MIN_RESPONSE: f64 = 1e-12;
const REMAINDER_TOLERANCE: f64 = 1e-9;

/// Where one metric is and where a correction should take it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Goal {
    pub metric: Metric,
    pub current: f64,
    /// The conservative target.
    pub aim: f64,
    pub range: Range,
}

impl Goal {
    fn raising(&self) -> bool {
        self.aim > self.current
    }

    fn passes_aim(&self, value: f64) -> bool {
        if self.raising() {
            value > self.aim
        } else {
            value < self.aim
        }
    }

    fn leaves_far_side(&self, value: f64) -> bool {
        if self.raising() {
            value > self.range.max
        } else {
            value < self.range.min
        }
    }
}

/// How well a plan lands, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Fit {
    /// Inside the range without passing the aim.
    Exact,
    /// Toward the aim but still outside the range.
    Partial,
    /// One increment passes the aim and stays inside the range.
    PastAim,
}

/// Outcome of sizing an adjustment.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Solved {
    Planned {
        /// Signed number of increments; negative removes.
        units: i64,
        deltas: Vec<IngredientDelta>,
        fit: Fit,
    },
    Blocked(NoChangeReason),
}

/// How many increments may be taken in each direction.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Limits {
    pub up: u32,
    pub down: u32,
}

/// Sizes an adjustment built by `build(units)` so the goal's metric moves
/// toward the aim without passing it.
pub(crate) fn solve<F>(ctx: &RecipeContext, goal: Goal, limits: Limits, build: F) -> Result<Solved>
where
    F: Fn(i64) -> Vec<IngredientDelta>,
{
    let needed = goal.aim - goal.current;
    let probe = build(1);
    if probe.is_empty() {
        return Ok(Solved::Blocked(NoChangeReason::NoEffect));
    }
    let per_unit = ctx.preview(&probe)?.get(goal.metric) - goal.current;
    if per_unit.abs() < MIN_RESPONSE {
        return Ok(Solved::Blocked(NoChangeReason::NoEffect));
    }

    let direction: i64 = if (per_unit > 0.0) == (needed > 0.0) { 1 } else { -1 };
    let limit = if direction > 0 { limits.up } else { limits.down };
    if limit == 0 {
        return Ok(Solved::Blocked(NoChangeReason::AtLimit));
    }

    let estimate = (needed / per_unit).abs().floor().min(f64::from(limit));
    let mut units = (estimate as u32).max(1);
    loop {
        let signed = direction * i64::from(units);
        let deltas = build(signed);
        if deltas.is_empty() {
            return Ok(Solved::Blocked(NoChangeReason::NoEffect));
        }
        let value = ctx.preview(&deltas)?.get(goal.metric);
        if !goal.passes_aim(value) {
            let fit = if goal.range.contains(value) { Fit::Exact } else { Fit::Partial };
            return Ok(Solved::Planned { units: signed, deltas, fit });
        }
        if units == 1 {
            if goal.leaves_far_side(value) {
                return Ok(Solved::Blocked(NoChangeReason::IncrementTooCoarse));
            }
            return Ok(Solved::Planned { units: signed, deltas, fit: Fit::PastAim });
        }
        units -= 1;
    }
}

/// Sizes whole-`step` changes to a single ingredient.
///
/// Removal never takes more than the ingredient holds; the last partial
/// increment removes the remainder.
pub(crate) fn single_ingredient(
    ctx: &RecipeContext,
    goal: Goal,
    ingredient: &Ingredient,
    step: f64,
    cap: u32,
) -> Result<Solved> {
    let held = ingredient.canonical_amount()?;
    let down = if held <= 0.0 {
        0
    } else {
        ((held / step - REMAINDER_TOLERANCE).ceil() as u32).min(cap)
    };
    let id = ingredient.id.clone();
    solve(ctx, goal, Limits { up: cap, down }, |units| {
        let amount = units as f64 * step;
        let amount = if units < 0 { amount.max(-held) } else { amount };
        vec![IngredientDelta::adjust(id.clone(), amount)]
    })
}

/// Sizes a change on each candidate in turn and keeps the best [`Fit`],
/// earliest candidate first on ties.
///
/// When every candidate is blocked, the first one's reason is returned.
/// `None` only when there are no candidates.
pub(crate) fn first_fit<'a>(
    ctx: &RecipeContext,
    goal: Goal,
    candidates: &[&'a Ingredient],
    step: f64,
    cap: u32,
) -> Result<Option<(&'a Ingredient, Solved)>> {
    let mut best: Option<(Fit, &'a Ingredient, Solved)> = None;
    let mut refused = None;
    for &ingredient in candidates {
        let solved = single_ingredient(ctx, goal, ingredient, step, cap)?;
        match solved {
            Solved::Planned { fit, .. } => {
                if best.as_ref().map_or(true, |(top, _, _)| fit < *top) {
                    best = Some((fit, ingredient, solved));
                }
                if fit == Fit::Exact {
                    break;
                }
            }
            Solved::Blocked(_) => {
                refused.get_or_insert((ingredient, solved));
            }
        }
    }
    Ok(best.map(|(_, ingredient, solved)| (ingredient, solved)).or(refused))
}

/// Rounds `raw` to the nearest multiple of `step`.
pub(crate) fn round_to_step(raw: f64, step: f64) -> f64 {
    (raw / step).round() * step
}

/// Candidates ordered by descending `key`, ties kept in recipe order.
///
/// Empty ingredients are dropped when `reducing`.
pub(crate) fn rank<'a, I, K>(candidates: I, reducing: bool, key: K) -> Result<Vec<&'a Ingredient>>
where
    I: IntoIterator<Item = &'a Ingredient>,
    K: Fn(&Ingredient) -> Result<f64>,
{
    let mut scored = Vec::new();
    for ingredient in candidates {
        if reducing && ingredient.canonical_amount()? <= 0.0 {
            continue;
        }
        scored.push((ingredient, key(ingredient)?));
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scored.into_iter().map(|(ingredient, _)| ingredient).collect())
}
