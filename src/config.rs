//! Engine configuration.
//!
//! [`EngineConfig`] deserializes from JSON with per-field defaults, so a
//! host only needs to spell out what it wants to change.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::IngredientCategory;
use crate::{Error, Result};

/// Discrete adjustment steps per ingredient category, in canonical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Increments {
    /// Base malt step, in kilograms.
    pub base_fermentable_kg: f64,
    /// Specialty grain step, in kilograms.
    pub specialty_fermentable_kg: f64,
    /// Sugar and adjunct step, in grams.
    pub sugar_adjunct_g: f64,
    /// Hop step, in grams.
    pub bittering_agent_g: f64,
    /// Step for proportional scaling, as a fraction of the current amount.
    pub scale_step: f64,
    /// Most increments a single proposal may take.
    pub max_per_proposal: u32,
}

impl Default for Increments {
    fn default() -> Self {
        Self {
            base_fermentable_kg: 0.25,
            specialty_fermentable_kg: 0.05,
            sugar_adjunct_g: 50.0,
            bittering_agent_g: 5.0,
            scale_step: 0.05,
            max_per_proposal: 200,
        }
    }
}

impl Increments {
    /// The increment for `category`, or `None` if strategies never adjust it.
    #[must_use]
    pub fn for_category(&self, category: IngredientCategory) -> Option<f64> {
        match category {
            IngredientCategory::BaseFermentable => Some(self.base_fermentable_kg),
            IngredientCategory::SpecialtyFermentable => Some(self.specialty_fermentable_kg),
            IngredientCategory::BitteringAgent => Some(self.bittering_agent_g),
            IngredientCategory::Other => Some(self.sugar_adjunct_g),
            IngredientCategory::BiologicalAgent => None,
        }
    }

    /// Rejects non-positive steps and a scale step of 100 % or more.
    pub fn validate(&self) -> Result<()> {
        let steps = [
            ("base_fermentable_kg", self.base_fermentable_kg),
            ("specialty_fermentable_kg", self.specialty_fermentable_kg),
            ("sugar_adjunct_g", self.sugar_adjunct_g),
            ("bittering_agent_g", self.bittering_agent_g),
            ("scale_step", self.scale_step),
        ];
        for (name, value) in steps {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::Config(format!("{name} must be positive, got {value}")));
            }
        }
        if self.scale_step >= 1.0 {
            return Err(Error::Config(format!(
                "scale_step must be below 1.0, got {}",
                self.scale_step
            )));
        }
        Ok(())
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ceiling on nodes visited per run. Derived from the graph size when unset.
    #[serde(default)]
    pub max_steps: Option<usize>,

    #[serde(default)]
    pub increments: Increments,

    /// Wall-clock limit hosts apply around a whole run.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            increments: Increments::default(),
            timeout_ms: None,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read configuration from a JSON file, using defaults if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_steps == Some(0) {
            return Err(Error::Config("max_steps must be at least 1".into()));
        }
        self.increments.validate()
    }

    /// The step ceiling for a graph of `node_count` nodes.
    #[must_use]
    pub fn step_budget(&self, node_count: usize) -> usize {
        self.max_steps.unwrap_or(node_count * 4 + 16)
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = EngineConfig::default();
        assert_eq!(config.max_steps, None);
        assert_eq!(config.increments.base_fermentable_kg, 0.25);
        assert_eq!(config.increments.bittering_agent_g, 5.0);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.step_budget(15), 76);
    }

    #[test]
    fn deserialize_partial_json() {
        let config = EngineConfig::from_json(
            r#"{ "max_steps": 40, "increments": { "bittering_agent_g": 2.5 }, "timeout_ms": 250 }"#,
        )
        .unwrap();
        assert_eq!(config.step_budget(15), 40);
        assert_eq!(config.increments.bittering_agent_g, 2.5);
        assert_eq!(config.increments.specialty_fermentable_kg, 0.05);
        assert_eq!(config.timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn non_positive_increment_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "increments": { "scale_step": 0.0 } }"#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn zero_budget_is_rejected() {
        let err = EngineConfig::from_json(r#"{ "max_steps": 0 }"#).unwrap_err();
        assert!(err.to_string().contains("max_steps"));
    }

    #[test]
    fn load_falls_back_to_defaults() {
        let config = EngineConfig::load("definitely-not-here/brew-workflow.json").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn biological_agents_have_no_increment() {
        let increments = Increments::default();
        assert_eq!(increments.for_category(IngredientCategory::BiologicalAgent), None);
        assert_eq!(increments.for_category(IngredientCategory::Other), Some(50.0));
    }
}
