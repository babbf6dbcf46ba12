//! Mutable recipe state for one optimization run.
//!
//! [`RecipeContext`] is the only surface the engine mutates. It owns a clone
//! of the caller's recipe, recomputes metrics on every request, and applies
//! ingredient deltas atomically.

use serde::{Deserialize, Serialize};

use crate::calculator::{self, Metrics};
use crate::model::{Ingredient, IngredientId, Recipe};
use crate::style::{Metric, MetricEvaluation, StyleTarget};
use crate::{Error, Result};

/// Float noise below this is treated as zero when a quantity is reduced.
const NEGATIVE_TOLERANCE: f64 = 1e-9;

/// A requested change to one ingredient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientDelta {
    pub ingredient: IngredientId,
    pub change: Change,
}

impl IngredientDelta {
    /// Add (or, when negative, remove) `amount` in the ingredient's canonical unit.
    pub fn adjust(ingredient: impl Into<IngredientId>, amount: f64) -> Self {
        Self {
            ingredient: ingredient.into(),
            change: Change::Adjust { amount },
        }
    }

    /// Multiply the ingredient's amount by `factor`.
    pub fn scale(ingredient: impl Into<IngredientId>, factor: f64) -> Self {
        Self {
            ingredient: ingredient.into(),
            change: Change::Scale { factor },
        }
    }

    /// Drop the ingredient from the recipe.
    pub fn remove(ingredient: impl Into<IngredientId>) -> Self {
        Self {
            ingredient: ingredient.into(),
            change: Change::Remove,
        }
    }

    /// Add a new ingredient; its id must not already be present.
    pub fn insert(ingredient: Ingredient) -> Self {
        Self {
            ingredient: ingredient.id.clone(),
            change: Change::Insert(ingredient),
        }
    }
}

/// The kinds of mutation a delta can carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Change {
    /// Signed amount in the ingredient's canonical unit.
    Adjust { amount: f64 },
    Scale { factor: f64 },
    Remove,
    Insert(Ingredient),
}

/// A saved copy of the context's recipe.
#[derive(Debug, Clone)]
pub struct RecipeSnapshot(Recipe);

/// Mutable wrapper around one run's working copy of a recipe.
///
/// # Example
///
/// ```rust
/// use brew_workflow::context::{IngredientDelta, RecipeContext};
/// use brew_workflow::model::{Ingredient, IngredientProperties, Recipe, Usage};
/// use brew_workflow::units::Quantity;
///
/// let recipe = Recipe::new("Pale", 20.0, 75.0, 60.0).with_ingredient(Ingredient::new(
///     "pale",
///     "Pale Ale Malt",
///     Quantity::kilograms(4.0),
///     Usage::Mash,
///     IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
/// ));
///
/// let mut ctx = RecipeContext::new(&recipe).unwrap();
/// let before = ctx.current_metrics().unwrap().original_gravity;
/// ctx.apply_delta(&IngredientDelta::adjust("pale", 0.5)).unwrap();
/// assert!(ctx.current_metrics().unwrap().original_gravity > before);
///
/// // The caller's recipe is untouched.
/// assert_eq!(recipe.ingredients[0].quantity.amount, 4.0);
/// ```
#[derive(Debug, Clone)]
pub struct RecipeContext {
    recipe: Recipe,
}

impl RecipeContext {
    /// Clone and validate `recipe` for exclusive use by one run.
    pub fn new(recipe: &Recipe) -> Result<Self> {
        calculator::calculate(recipe)?;
        Ok(Self {
            recipe: recipe.clone(),
        })
    }

    /// Recomputes all metrics from the current ingredient list.
    pub fn current_metrics(&self) -> Result<Metrics> {
        calculator::calculate(&self.recipe)
    }

    /// Checks one metric against its range in `target`.
    pub fn evaluate(&self, metric: Metric, target: &StyleTarget) -> Result<MetricEvaluation> {
        let metrics = self.current_metrics()?;
        Ok(target.evaluate(metric, &metrics))
    }

    /// Checks every metric against `target`.
    pub fn evaluate_all(&self, target: &StyleTarget) -> Result<Vec<MetricEvaluation>> {
        let metrics = self.current_metrics()?;
        Ok(target.evaluate_all(&metrics))
    }

    /// The working copy as it stands.
    #[must_use]
    pub fn recipe(&self) -> &Recipe {
        &self.recipe
    }

    /// Consumes the context, returning the working copy.
    #[must_use]
    pub fn into_recipe(self) -> Recipe {
        self.recipe
    }

    /// Looks up an ingredient by id.
    pub fn ingredient(&self, id: &IngredientId) -> Option<&Ingredient> {
        self.recipe.ingredient(id)
    }

    /// Applies one delta, leaving the context untouched if it is rejected.
    ///
    /// Records nothing; tracing what changed is the engine's job.
    pub fn apply_delta(&mut self, delta: &IngredientDelta) -> Result<()> {
        let mut candidate = self.recipe.clone();
        mutate(&mut candidate, delta)?;
        calculator::calculate(&candidate)
            .map_err(|e| Error::mutation(delta.ingredient.as_str(), e.to_string()))?;
        self.recipe = candidate;
        Ok(())
    }

    /// Applies every delta or none of them.
    pub fn apply_all(&mut self, deltas: &[IngredientDelta]) -> Result<()> {
        let snapshot = self.snapshot();
        for delta in deltas {
            if let Err(e) = self.apply_delta(delta) {
                self.restore(snapshot);
                return Err(e);
            }
        }
        Ok(())
    }

    /// Metrics the recipe would have after `deltas`, without mutating `self`.
    pub fn preview(&self, deltas: &[IngredientDelta]) -> Result<Metrics> {
        let mut scratch = self.clone();
        scratch.apply_all(deltas)?;
        scratch.current_metrics()
    }

    /// Captures the recipe so a later [`restore`](Self::restore) can undo changes.
    #[must_use]
    pub fn snapshot(&self) -> RecipeSnapshot {
        RecipeSnapshot(self.recipe.clone())
    }

    /// Puts back a recipe captured by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, snapshot: RecipeSnapshot) {
        self.recipe = snapshot.0;
    }
}

fn mutate(recipe: &mut Recipe, delta: &IngredientDelta) -> Result<()> {
    let id = &delta.ingredient;
    match &delta.change {
        Change::Insert(ingredient) => {
            if recipe.ingredient(&ingredient.id).is_some() {
                return Err(Error::mutation(id.as_str(), "ingredient already present"));
            }
            recipe.ingredients.push(ingredient.clone());
            Ok(())
        }
        Change::Remove => {
            let before = recipe.ingredients.len();
            recipe.ingredients.retain(|i| &i.id != id);
            if recipe.ingredients.len() == before {
                return Err(not_found(id));
            }
            Ok(())
        }
        Change::Adjust { amount } => {
            let ingredient = recipe.ingredient_mut(id).ok_or_else(|| not_found(id))?;
            let current = ingredient.canonical_amount()?;
            let next = checked_amount(id, current + amount)?;
            ingredient.set_canonical_amount(next)
        }
        Change::Scale { factor } => {
            if !factor.is_finite() || *factor < 0.0 {
                return Err(Error::mutation(id.as_str(), format!("scale factor {factor} is invalid")));
            }
            let ingredient = recipe.ingredient_mut(id).ok_or_else(|| not_found(id))?;
            let next = checked_amount(id, ingredient.canonical_amount()? * factor)?;
            ingredient.set_canonical_amount(next)
        }
    }
}

fn checked_amount(id: &IngredientId, amount: f64) -> Result<f64> {
    if !amount.is_finite() {
        return Err(Error::mutation(id.as_str(), "resulting quantity is not finite"));
    }
    if amount < -NEGATIVE_TOLERANCE {
        return Err(Error::mutation(
            id.as_str(),
            format!("resulting quantity {amount} would be negative"),
        ));
    }
    Ok(amount.max(0.0))
}

fn not_found(id: &IngredientId) -> Error {
    Error::mutation(id.as_str(), "ingredient not found in recipe")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IngredientProperties, Usage};
    use crate::style::Range;
    use crate::units::{Quantity, Unit};

    fn recipe() -> Recipe {
        Recipe::new("Pale", 20.0, 75.0, 60.0)
            .with_ingredient(Ingredient::new(
                "pale",
                "Pale Ale Malt",
                Quantity::kilograms(4.0),
                Usage::Mash,
                IngredientProperties::BaseFermentable { potential: 1.037, color: 3.0 },
            ))
            .with_ingredient(Ingredient::new(
                "magnum",
                "Magnum",
                Quantity::new(1.0, Unit::Ounce),
                Usage::Boil { minutes: 60.0 },
                IngredientProperties::BitteringAgent { alpha_acid: 12.0 },
            ))
    }

    fn target() -> StyleTarget {
        StyleTarget {
            style: "american-pale-ale".into(),
            original_gravity: Range::new(1.045, 1.060),
            final_gravity: Range::new(1.010, 1.015),
            abv: Range::new(4.5, 6.2),
            ibu: Range::new(30.0, 50.0),
            srm: Range::new(5.0, 10.0),
        }
    }

    #[test]
    fn metrics_follow_mutations() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let before = ctx.current_metrics().unwrap();
        ctx.apply_delta(&IngredientDelta::adjust("pale", 1.0)).unwrap();
        let after = ctx.current_metrics().unwrap();
        assert!(after.original_gravity > before.original_gravity);
        assert!(after.ibu < before.ibu, "utilization drops with gravity");
    }

    #[test]
    fn evaluate_reports_deviation() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        ctx.apply_delta(&IngredientDelta::scale("pale", 0.5)).unwrap();
        let eval = ctx.evaluate(Metric::OriginalGravity, &target()).unwrap();
        assert!(!eval.in_range);
        assert!(eval.deviation < 0.0);
        assert!((eval.current - 1.0 - 0.023_16).abs() < 1e-4);
    }

    #[test]
    fn adjust_uses_canonical_units() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        // Five grams onto a quantity held in ounces.
        ctx.apply_delta(&IngredientDelta::adjust("magnum", 5.0)).unwrap();
        let hop = ctx.ingredient(&"magnum".into()).unwrap();
        assert_eq!(hop.quantity.unit, Unit::Ounce);
        assert!((hop.canonical_amount().unwrap() - 33.349_523_125).abs() < 1e-9);
    }

    #[test]
    fn negative_result_is_rejected_atomically() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let err = ctx
            .apply_delta(&IngredientDelta::adjust("pale", -4.5))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMutation { .. }));
        assert_eq!(ctx.recipe(), &recipe());
    }

    #[test]
    fn float_noise_snaps_to_zero() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        ctx.apply_delta(&IngredientDelta::adjust("pale", -4.000_000_000_1))
            .unwrap();
        assert_eq!(ctx.ingredient(&"pale".into()).unwrap().quantity.amount, 0.0);
    }

    #[test]
    fn unknown_ingredient_is_rejected() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let err = ctx.apply_delta(&IngredientDelta::remove("crystal")).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn insert_and_remove() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let crystal = Ingredient::new(
            "crystal",
            "Crystal 60",
            Quantity::kilograms(0.3),
            Usage::Mash,
            IngredientProperties::SpecialtyFermentable { potential: 1.034, color: 60.0 },
        );
        ctx.apply_delta(&IngredientDelta::insert(crystal.clone())).unwrap();
        assert!(ctx.current_metrics().unwrap().srm > 5.0);

        let dup = ctx.apply_delta(&IngredientDelta::insert(crystal)).unwrap_err();
        assert!(matches!(dup, Error::InvalidMutation { .. }));

        ctx.apply_delta(&IngredientDelta::remove("crystal")).unwrap();
        assert_eq!(ctx.recipe(), &recipe());
    }

    #[test]
    fn invalid_insert_is_rejected() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let bad = Ingredient::new(
            "bad",
            "Bad Hop",
            Quantity::grams(10.0),
            Usage::Boil { minutes: 60.0 },
            IngredientProperties::BitteringAgent { alpha_acid: 150.0 },
        );
        let err = ctx.apply_delta(&IngredientDelta::insert(bad)).unwrap_err();
        assert!(matches!(err, Error::InvalidMutation { .. }));
        assert_eq!(ctx.recipe().ingredients.len(), 2);
    }

    #[test]
    fn apply_all_rolls_back_on_failure() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let err = ctx
            .apply_all(&[
                IngredientDelta::adjust("pale", 1.0),
                IngredientDelta::adjust("magnum", -100.0),
            ])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidMutation { .. }));
        assert_eq!(ctx.recipe(), &recipe());
    }

    #[test]
    fn preview_does_not_mutate() {
        let ctx = RecipeContext::new(&recipe()).unwrap();
        let previewed = ctx.preview(&[IngredientDelta::adjust("pale", 1.0)]).unwrap();
        assert!(previewed.original_gravity > ctx.current_metrics().unwrap().original_gravity);
        assert_eq!(ctx.recipe(), &recipe());
    }

    #[test]
    fn snapshot_and_restore() {
        let mut ctx = RecipeContext::new(&recipe()).unwrap();
        let snapshot = ctx.snapshot();
        ctx.apply_delta(&IngredientDelta::scale("pale", 2.0)).unwrap();
        assert_ne!(ctx.recipe(), &recipe());
        ctx.restore(snapshot);
        assert_eq!(ctx.recipe(), &recipe());
        assert_eq!(ctx.into_recipe(), recipe());
    }

    #[test]
    fn invalid_recipe_is_rejected_up_front() {
        let mut bad = recipe();
        bad.batch_volume_l = -5.0;
        let err = RecipeContext::new(&bad).unwrap_err();
        assert!(matches!(err, Error::InvalidBatchParameters(_)));
    }
}
