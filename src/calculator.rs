//! Metrics calculator.
//!
//! Maps a formulation to its five derived metrics in closed form. Every
//! function here is pure: the same recipe always yields the same [`Metrics`].
//!
//! # Formulas
//!
//! - **Gravity**: `points = Σ (potential − 1)·1000 · kg · 8.3454 / L`, with
//!   base and specialty fermentables scaled by mash efficiency and sugars
//!   counted in full. `OG = 1 + points / 1000`.
//! - **Final gravity**: `FG = 1 + (OG − 1)·(1 − attenuation / 100)` where the
//!   attenuation is the mean over biological agents present (75 % if none).
//! - **Alcohol**: `ABV = (OG − FG) · 131.25`.
//! - **Bitterness** (Tinseth): utilization is
//!   `1.65 · 0.000125^(OG − 1) · (1 − e^(−0.04·t)) / 4.15` and each boil addition
//!   contributes `utilization · alpha/100 · grams · 1000 / L`. Utilization
//!   falls as OG rises.
//! - **Color** (Morey): `MCU = Σ lovibond · kg · 8.3454 / L` and
//!   `SRM = 1.4922 · MCU^0.6859`, which flattens as ingredients stack up.

use serde::{Deserialize, Serialize};

use crate::model::{Ingredient, IngredientCategory, IngredientProperties, Recipe, Usage};
use crate::style::Metric;
use crate::units::CanonicalUnit;
use crate::Result;

/// Converts kg/L into lb/US gal.
pub const KG_PER_L_IN_LB_PER_GAL: f64 = 8.345_404;
/// Alcohol by volume per unit of gravity drop.
pub const ABV_COEFFICIENT: f64 = 131.25;
/// Attenuation assumed when no biological agent is present.
pub const DEFAULT_ATTENUATION: f64 = 75.0;

const MOREY_FACTOR: f64 = 1.4922;
const MOREY_EXPONENT: f64 = 0.6859;

/// The five derived metrics of a formulation.
///
/// Always recomputed from ingredients; never stored as independent truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Specific gravity before fermentation.
    pub original_gravity: f64,
    /// Specific gravity after fermentation.
    pub final_gravity: f64,
    /// Alcohol by volume, in percent.
    pub abv: f64,
    /// International bitterness units (Tinseth).
    pub ibu: f64,
    /// Color on the SRM scale (Morey).
    pub srm: f64,
}

impl Metrics {
    #[must_use]
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::OriginalGravity => self.original_gravity,
            Metric::FinalGravity => self.final_gravity,
            Metric::Abv => self.abv,
            Metric::Ibu => self.ibu,
            Metric::Srm => self.srm,
        }
    }
}

/// Computes all five metrics for `recipe`.
///
/// Fails with `InvalidBatchParameters` or `InvalidIngredientData` when the
/// recipe does not validate.
pub fn calculate(recipe: &Recipe) -> Result<Metrics> {
    recipe.validate()?;

    let points = recipe
        .ingredients
        .iter()
        .map(|i| gravity_points(i, recipe))
        .sum::<Result<f64>>()?;
    let original_gravity = 1.0 + points / 1000.0;

    let attenuation = average_attenuation(recipe);
    let final_gravity = 1.0 + (original_gravity - 1.0) * (1.0 - attenuation / 100.0);
    let abv = (original_gravity - final_gravity) * ABV_COEFFICIENT;

    let ibu = recipe
        .ingredients
        .iter()
        .map(|i| ingredient_ibu(i, original_gravity, recipe))
        .sum::<Result<f64>>()?;

    let mcu = recipe
        .ingredients
        .iter()
        .map(|i| ingredient_mcu(i, recipe))
        .sum::<Result<f64>>()?;

    Ok(Metrics {
        original_gravity,
        final_gravity,
        abv,
        ibu,
        srm: morey_srm(mcu),
    })
}

/// Gravity points (thousandths above 1.000) one ingredient contributes.
pub fn gravity_points(ingredient: &Ingredient, recipe: &Recipe) -> Result<f64> {
    let Some(potential) = ingredient.properties.potential() else {
        return Ok(0.0);
    };
    let kg = mass_kg(ingredient)?;
    let ppg = (potential - 1.0) * 1000.0;
    let yield_fraction = if ingredient.category().is_mashed() {
        recipe.efficiency_pct / 100.0
    } else {
        1.0
    };
    Ok(ppg * kg * KG_PER_L_IN_LB_PER_GAL * yield_fraction / recipe.batch_volume_l)
}

/// Mean attenuation over biological agents with a non-zero amount.
#[must_use]
pub fn average_attenuation(recipe: &Recipe) -> f64 {
    let (sum, count) = recipe
        .by_category(IngredientCategory::BiologicalAgent)
        .filter(|i| i.quantity.amount > 0.0)
        .filter_map(|i| match i.properties {
            IngredientProperties::BiologicalAgent { attenuation } => Some(attenuation),
            _ => None,
        })
        .fold((0.0, 0usize), |(sum, count), a| (sum + a, count + 1));
    if count == 0 {
        DEFAULT_ATTENUATION
    } else {
        sum / count as f64
    }
}

/// Tinseth hop utilization for a wort of `original_gravity` boiled `minutes`.
#[must_use]
pub fn tinseth_utilization(original_gravity: f64, minutes: f64) -> f64 {
    let bigness = 1.65 * 0.000_125_f64.powf(original_gravity - 1.0);
    let boil_time_factor = (1.0 - (-0.04 * minutes).exp()) / 4.15;
    bigness * boil_time_factor
}

/// Bitterness one ingredient contributes at the given original gravity.
///
/// Only boil and first-wort additions of bittering agents count; boil time
/// is capped at the recipe's boil duration.
pub fn ingredient_ibu(ingredient: &Ingredient, original_gravity: f64, recipe: &Recipe) -> Result<f64> {
    let per_gram = ibu_per_gram(ingredient, original_gravity, recipe);
    if per_gram == 0.0 {
        return Ok(0.0);
    }
    Ok(per_gram * ingredient.canonical_amount()?)
}

/// Bitterness each gram of `ingredient` adds at `original_gravity`.
///
/// Zero for anything that is not a boil or first-wort addition.
#[must_use]
pub fn ibu_per_gram(ingredient: &Ingredient, original_gravity: f64, recipe: &Recipe) -> f64 {
    let IngredientProperties::BitteringAgent { alpha_acid } = ingredient.properties else {
        return 0.0;
    };
    let minutes = match ingredient.usage {
        Usage::Boil { minutes } => minutes.min(recipe.boil_minutes),
        Usage::FirstWort => recipe.boil_minutes,
        _ => return 0.0,
    };
    let alpha_mg_per_l = alpha_acid / 100.0 * 1000.0 / recipe.batch_volume_l;
    tinseth_utilization(original_gravity, minutes) * alpha_mg_per_l
}

/// Malt color units one ingredient contributes.
pub fn ingredient_mcu(ingredient: &Ingredient, recipe: &Recipe) -> Result<f64> {
    let color = ingredient.properties.color();
    if color == 0.0 {
        return Ok(0.0);
    }
    let kg = mass_kg(ingredient)?;
    Ok(color * kg * KG_PER_L_IN_LB_PER_GAL / recipe.batch_volume_l)
}

/// Morey's curve from malt color units to SRM.
#[must_use]
pub fn morey_srm(mcu: f64) -> f64 {
    if mcu <= 0.0 {
        0.0
    } else {
        MOREY_FACTOR * mcu.powf(MOREY_EXPONENT)
    }
}

fn mass_kg(ingredient: &Ingredient) -> Result<f64> {
    let amount = ingredient.canonical_amount()?;
    Ok(match ingredient.category().canonical_unit() {
        CanonicalUnit::Gram => amount / 1000.0,
        CanonicalUnit::Kilogram | CanonicalUnit::Package => amount,
    })
}
