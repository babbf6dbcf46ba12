//! Quantity units and conversion to each category's canonical unit.

use std::fmt;

use serde::{Deserialize, Serialize};

const GRAMS_PER_KILOGRAM: f64 = 1000.0;
const KILOGRAMS_PER_POUND: f64 = 0.453_592_37;
const KILOGRAMS_PER_OUNCE: f64 = 0.028_349_523_125;

/// Unit an ingredient amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kilogram,
    Gram,
    Pound,
    Ounce,
    /// Pitchable package of a biological agent.
    Package,
    /// Discrete count.
    Each,
}

impl Unit {
    /// Kilograms per one of this unit, or `None` for count units.
    #[must_use]
    pub fn kilograms(self) -> Option<f64> {
        match self {
            Unit::Kilogram => Some(1.0),
            Unit::Gram => Some(1.0 / GRAMS_PER_KILOGRAM),
            Unit::Pound => Some(KILOGRAMS_PER_POUND),
            Unit::Ounce => Some(KILOGRAMS_PER_OUNCE),
            Unit::Package | Unit::Each => None,
        }
    }

    /// Whether this is a mass unit.
    #[must_use]
    pub fn is_mass(self) -> bool {
        self.kilograms().is_some()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Unit::Kilogram => "kg",
            Unit::Gram => "g",
            Unit::Pound => "lb",
            Unit::Ounce => "oz",
            Unit::Package => "pkg",
            Unit::Each => "ea",
        };
        f.write_str(symbol)
    }
}

/// The unit all calculations for a category are carried out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalUnit {
    Kilogram,
    Gram,
    Package,
}

impl CanonicalUnit {
    /// Conversion factor from `unit` into this canonical unit.
    ///
    /// Returns `None` when the two are not convertible (mass vs. count).
    #[must_use]
    pub fn factor_from(self, unit: Unit) -> Option<f64> {
        match self {
            CanonicalUnit::Kilogram => unit.kilograms(),
            CanonicalUnit::Gram => unit.kilograms().map(|kg| kg * GRAMS_PER_KILOGRAM),
            CanonicalUnit::Package => match unit {
                Unit::Package | Unit::Each => Some(1.0),
                _ => None,
            },
        }
    }
}

impl fmt::Display for CanonicalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            CanonicalUnit::Kilogram => "kg",
            CanonicalUnit::Gram => "g",
            CanonicalUnit::Package => "pkg",
        };
        f.write_str(symbol)
    }
}

/// An amount together with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub amount: f64,
    pub unit: Unit,
}

impl Quantity {
    #[must_use]
    pub fn new(amount: f64, unit: Unit) -> Self {
        Self { amount, unit }
    }

    #[must_use]
    pub fn kilograms(amount: f64) -> Self {
        Self::new(amount, Unit::Kilogram)
    }

    #[must_use]
    pub fn grams(amount: f64) -> Self {
        Self::new(amount, Unit::Gram)
    }

    #[must_use]
    pub fn packages(amount: f64) -> Self {
        Self::new(amount, Unit::Package)
    }

    /// The amount expressed in `canonical`, if convertible.
    #[must_use]
    pub fn in_canonical(&self, canonical: CanonicalUnit) -> Option<f64> {
        canonical.factor_from(self.unit).map(|factor| self.amount * factor)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.amount, self.unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mass_units_convert_to_grams() {
        let q = Quantity::new(1.0, Unit::Ounce);
        let grams = q.in_canonical(CanonicalUnit::Gram).unwrap();
        assert!((grams - 28.349_523_125).abs() < 1e-9);

        let q = Quantity::new(2.0, Unit::Pound);
        let kg = q.in_canonical(CanonicalUnit::Kilogram).unwrap();
        assert!((kg - 0.907_184_74).abs() < 1e-9);
    }

    #[test]
    fn count_units_only_convert_to_packages() {
        assert_eq!(Quantity::packages(2.0).in_canonical(CanonicalUnit::Package), Some(2.0));
        assert_eq!(Quantity::new(1.0, Unit::Each).in_canonical(CanonicalUnit::Package), Some(1.0));
        assert_eq!(Quantity::packages(1.0).in_canonical(CanonicalUnit::Gram), None);
        assert_eq!(Quantity::grams(11.0).in_canonical(CanonicalUnit::Package), None);
    }

    #[test]
    fn display_uses_symbols() {
        assert_eq!(Quantity::kilograms(4.5).to_string(), "4.5 kg");
        assert_eq!(CanonicalUnit::Gram.to_string(), "g");
    }
}
