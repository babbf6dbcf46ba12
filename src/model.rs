//! Ingredients and formulations.
//!
//! A [`Recipe`] is the caller-owned formulation an optimization run starts
//! from. Category-specific attributes live in [`IngredientProperties`], so an
//! ingredient can only ever carry the attributes of its own category.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::units::{CanonicalUnit, Quantity};
use crate::{Error, Result};

/// Stable identity of an ingredient within a recipe.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IngredientId(String);

impl IngredientId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IngredientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IngredientId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The closed set of ingredient categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngredientCategory {
    BaseFermentable,
    SpecialtyFermentable,
    BitteringAgent,
    BiologicalAgent,
    Other,
}

impl IngredientCategory {
    /// Unit every calculation for this category is carried out in.
    #[must_use]
    pub fn canonical_unit(self) -> CanonicalUnit {
        match self {
            IngredientCategory::BaseFermentable | IngredientCategory::SpecialtyFermentable => {
                CanonicalUnit::Kilogram
            }
            IngredientCategory::BitteringAgent | IngredientCategory::Other => CanonicalUnit::Gram,
            IngredientCategory::BiologicalAgent => CanonicalUnit::Package,
        }
    }

    /// Base and specialty fermentables, the ones subject to mash efficiency.
    #[must_use]
    pub fn is_mashed(self) -> bool {
        matches!(
            self,
            IngredientCategory::BaseFermentable | IngredientCategory::SpecialtyFermentable
        )
    }
}

impl fmt::Display for IngredientCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngredientCategory::BaseFermentable => "base fermentable",
            IngredientCategory::SpecialtyFermentable => "specialty fermentable",
            IngredientCategory::BitteringAgent => "bittering agent",
            IngredientCategory::BiologicalAgent => "biological agent",
            IngredientCategory::Other => "other",
        };
        f.write_str(name)
    }
}

/// Category-specific chemical attributes.
///
/// `potential` is the specific gravity one pound of the ingredient yields
/// in one US gallon (1.037 for a typical pale malt). `color` is in degrees
/// Lovibond.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "snake_case")]
pub enum IngredientProperties {
    BaseFermentable { potential: f64, color: f64 },
    SpecialtyFermentable { potential: f64, color: f64 },
    /// `alpha_acid` is a percentage of the agent's mass.
    BitteringAgent { alpha_acid: f64 },
    /// `attenuation` is the expected apparent conversion percentage.
    BiologicalAgent { attenuation: f64 },
    /// Adjuncts and sugars; `potential` is `None` for non-fermentables.
    Other {
        #[serde(default)]
        potential: Option<f64>,
        #[serde(default)]
        color: f64,
    },
}

impl IngredientProperties {
    #[must_use]
    pub fn category(&self) -> IngredientCategory {
        match self {
            IngredientProperties::BaseFermentable { .. } => IngredientCategory::BaseFermentable,
            IngredientProperties::SpecialtyFermentable { .. } => {
                IngredientCategory::SpecialtyFermentable
            }
            IngredientProperties::BitteringAgent { .. } => IngredientCategory::BitteringAgent,
            IngredientProperties::BiologicalAgent { .. } => IngredientCategory::BiologicalAgent,
            IngredientProperties::Other { .. } => IngredientCategory::Other,
        }
    }

    /// Extract potential, for every ingredient that has one.
    #[must_use]
    pub fn potential(&self) -> Option<f64> {
        match *self {
            IngredientProperties::BaseFermentable { potential, .. }
            | IngredientProperties::SpecialtyFermentable { potential, .. } => Some(potential),
            IngredientProperties::Other { potential, .. } => potential,
            _ => None,
        }
    }

    /// Color contribution in degrees Lovibond (0 for non-coloring categories).
    #[must_use]
    pub fn color(&self) -> f64 {
        match *self {
            IngredientProperties::BaseFermentable { color, .. }
            | IngredientProperties::SpecialtyFermentable { color, .. }
            | IngredientProperties::Other { color, .. } => color,
            _ => 0.0,
        }
    }
}

/// When, and for how long, an ingredient acts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Usage {
    Mash,
    Boil { minutes: f64 },
    /// Added to the kettle before the boil; exposed for the full boil.
    FirstWort,
    Whirlpool { minutes: f64 },
    DryHop { days: f64 },
    Fermentation,
}

impl Usage {
    fn duration(&self) -> Option<f64> {
        match *self {
            Usage::Boil { minutes } | Usage::Whirlpool { minutes } => Some(minutes),
            Usage::DryHop { days } => Some(days),
            _ => None,
        }
    }
}

/// One formulation component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub id: IngredientId,
    pub name: String,
    pub quantity: Quantity,
    pub usage: Usage,
    pub properties: IngredientProperties,
}

impl Ingredient {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        quantity: Quantity,
        usage: Usage,
        properties: IngredientProperties,
    ) -> Self {
        Self {
            id: IngredientId::new(id),
            name: name.into(),
            quantity,
            usage,
            properties,
        }
    }

    #[must_use]
    pub fn category(&self) -> IngredientCategory {
        self.properties.category()
    }

    /// The amount in the category's canonical unit.
    pub fn canonical_amount(&self) -> Result<f64> {
        let canonical = self.category().canonical_unit();
        self.quantity.in_canonical(canonical).ok_or_else(|| {
            Error::ingredient(
                self.id.as_str(),
                format!(
                    "unit '{}' cannot be converted to '{canonical}' for a {}",
                    self.quantity.unit,
                    self.category()
                ),
            )
        })
    }

    /// Sets the amount from a canonical value, keeping the display unit.
    pub(crate) fn set_canonical_amount(&mut self, canonical_amount: f64) -> Result<()> {
        let canonical = self.category().canonical_unit();
        let factor = canonical.factor_from(self.quantity.unit).ok_or_else(|| {
            Error::mutation(
                self.id.as_str(),
                format!("unit '{}' is not convertible to '{canonical}'", self.quantity.unit),
            )
        })?;
        self.quantity.amount = canonical_amount / factor;
        Ok(())
    }

    /// Checks quantity, unit and attribute bounds.
    pub fn validate(&self) -> Result<()> {
        let id = self.id.as_str();
        let amount = self.quantity.amount;
        if !amount.is_finite() {
            return Err(Error::ingredient(id, "quantity is not a finite number"));
        }
        if amount < 0.0 {
            return Err(Error::ingredient(id, format!("quantity {amount} is negative")));
        }
        self.canonical_amount()?;

        if let Some(duration) = self.usage.duration() {
            if !duration.is_finite() || duration < 0.0 {
                return Err(Error::ingredient(id, format!("usage time {duration} is invalid")));
            }
        }

        match self.properties {
            IngredientProperties::BaseFermentable { potential, color }
            | IngredientProperties::SpecialtyFermentable { potential, color } => {
                check_potential(id, potential)?;
                check_color(id, color)
            }
            IngredientProperties::Other { potential, color } => {
                if let Some(potential) = potential {
                    check_potential(id, potential)?;
                }
                check_color(id, color)
            }
            IngredientProperties::BitteringAgent { alpha_acid } => {
                check_percentage(id, "alpha acid", alpha_acid)
            }
            IngredientProperties::BiologicalAgent { attenuation } => {
                check_percentage(id, "attenuation", attenuation)
            }
        }
    }
}

fn check_potential(id: &str, potential: f64) -> Result<()> {
    if potential.is_finite() && potential >= 1.0 {
        Ok(())
    } else {
        Err(Error::ingredient(id, format!("extract potential {potential} is below 1.000")))
    }
}

fn check_color(id: &str, color: f64) -> Result<()> {
    if color.is_finite() && color >= 0.0 {
        Ok(())
    } else {
        Err(Error::ingredient(id, format!("color {color} is invalid")))
    }
}

fn check_percentage(id: &str, what: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(Error::ingredient(id, format!("{what} {value}% is outside 0-100")))
    }
}

/// A formulation: batch parameters plus an ordered ingredient list.
///
/// Ingredient order only matters for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    /// Volume into the fermenter, in liters.
    pub batch_volume_l: f64,
    /// Mash efficiency as a percentage in (0, 100].
    pub efficiency_pct: f64,
    /// Boil duration in minutes.
    pub boil_minutes: f64,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
}

impl Recipe {
    pub fn new(
        name: impl Into<String>,
        batch_volume_l: f64,
        efficiency_pct: f64,
        boil_minutes: f64,
    ) -> Self {
        Self {
            name: name.into(),
            batch_volume_l,
            efficiency_pct,
            boil_minutes,
            ingredients: Vec::new(),
        }
    }

    /// Builder-style ingredient append.
    #[must_use]
    pub fn with_ingredient(mut self, ingredient: Ingredient) -> Self {
        self.ingredients.push(ingredient);
        self
    }

    pub fn ingredient(&self, id: &IngredientId) -> Option<&Ingredient> {
        self.ingredients.iter().find(|i| &i.id == id)
    }

    pub(crate) fn ingredient_mut(&mut self, id: &IngredientId) -> Option<&mut Ingredient> {
        self.ingredients.iter_mut().find(|i| &i.id == id)
    }

    /// Ingredients of one category, in recipe order.
    pub fn by_category(&self, category: IngredientCategory) -> impl Iterator<Item = &Ingredient> {
        self.ingredients.iter().filter(move |i| i.category() == category)
    }

    /// Checks the batch parameters only.
    pub fn validate_batch(&self) -> Result<()> {
        let volume = self.batch_volume_l;
        if !volume.is_finite() || volume <= 0.0 {
            return Err(Error::InvalidBatchParameters(format!(
                "batch volume must be greater than zero, got {volume}"
            )));
        }
        let efficiency = self.efficiency_pct;
        if !efficiency.is_finite() || efficiency <= 0.0 || efficiency > 100.0 {
            return Err(Error::InvalidBatchParameters(format!(
                "efficiency must be within (0, 100], got {efficiency}"
            )));
        }
        let boil = self.boil_minutes;
        if !boil.is_finite() || boil < 0.0 {
            return Err(Error::InvalidBatchParameters(format!(
                "boil duration must be non-negative, got {boil}"
            )));
        }
        Ok(())
    }

    /// Checks batch parameters, every ingredient, and id uniqueness.
    pub fn validate(&self) -> Result<()> {
        self.validate_batch()?;
        let mut seen = BTreeSet::new();
        for ingredient in &self.ingredients {
            if !seen.insert(&ingredient.id) {
                return Err(Error::ingredient(
                    ingredient.id.as_str(),
                    "ingredient id appears more than once",
                ));
            }
            ingredient.validate()?;
        }
        Ok(())
    }
}
