//! Style targets and metric evaluation.
//!
//! A [`StyleTarget`] is resolved by the host before a run starts and stays
//! immutable for its whole duration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calculator::Metrics;
use crate::{Error, Result};

/// Fraction of the way from a violated boundary toward mid-range that
/// strategies aim for.
pub const CONSERVATIVE_FRACTION: f64 = 0.25;

/// The five derived formulation metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    OriginalGravity,
    FinalGravity,
    Abv,
    Ibu,
    Srm,
}

impl Metric {
    /// Every metric, in declaration order.
    pub const ALL: [Metric; 5] = [
        Metric::OriginalGravity,
        Metric::FinalGravity,
        Metric::Abv,
        Metric::Ibu,
        Metric::Srm,
    ];
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Metric::OriginalGravity => "OG",
            Metric::FinalGravity => "FG",
            Metric::Abv => "ABV",
            Metric::Ibu => "IBU",
            Metric::Srm => "SRM",
        };
        f.write_str(name)
    }
}

/// Where a value sits relative to a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Below,
    Within,
    Above,
}

/// An inclusive `[min, max]` acceptance range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    #[must_use]
    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }

    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    #[must_use]
    pub fn position(&self, value: f64) -> Position {
        if value < self.min {
            Position::Below
        } else if value > self.max {
            Position::Above
        } else {
            Position::Within
        }
    }

    /// Signed distance to the violated boundary; zero inside the range.
    #[must_use]
    pub fn deviation(&self, value: f64) -> f64 {
        match self.position(value) {
            Position::Below => value - self.min,
            Position::Above => value - self.max,
            Position::Within => 0.0,
        }
    }

    /// The value a correction should aim for, or `None` when `value` is in range.
    ///
    /// The target sits [`CONSERVATIVE_FRACTION`] of the way from the violated
    /// boundary toward the midpoint.
    #[must_use]
    pub fn conservative_target(&self, value: f64) -> Option<f64> {
        let mid = self.midpoint();
        match self.position(value) {
            Position::Below => Some(self.min + CONSERVATIVE_FRACTION * (mid - self.min)),
            Position::Above => Some(self.max - CONSERVATIVE_FRACTION * (self.max - mid)),
            Position::Within => None,
        }
    }

    fn validate(&self, metric: Metric) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::InvalidStyleTarget(format!("{metric} range is not finite")));
        }
        if self.min > self.max {
            return Err(Error::InvalidStyleTarget(format!(
                "{metric} minimum {} exceeds maximum {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Acceptable range per metric for a named style.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleTarget {
    /// Identifier the host resolved the ranges from.
    pub style: String,
    pub original_gravity: Range,
    pub final_gravity: Range,
    pub abv: Range,
    pub ibu: Range,
    pub srm: Range,
}

impl StyleTarget {
    #[must_use]
    pub fn range(&self, metric: Metric) -> Range {
        match metric {
            Metric::OriginalGravity => self.original_gravity,
            Metric::FinalGravity => self.final_gravity,
            Metric::Abv => self.abv,
            Metric::Ibu => self.ibu,
            Metric::Srm => self.srm,
        }
    }

    pub fn validate(&self) -> Result<()> {
        Metric::ALL
            .iter()
            .try_for_each(|&metric| self.range(metric).validate(metric))
    }

    #[must_use]
    pub fn evaluate(&self, metric: Metric, metrics: &Metrics) -> MetricEvaluation {
        MetricEvaluation::new(metric, metrics.get(metric), self.range(metric))
    }

    /// Evaluations for all five metrics, in [`Metric::ALL`] order.
    #[must_use]
    pub fn evaluate_all(&self, metrics: &Metrics) -> Vec<MetricEvaluation> {
        Metric::ALL
            .iter()
            .map(|&metric| self.evaluate(metric, metrics))
            .collect()
    }
}

/// Result of checking one metric against its range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricEvaluation {
    pub metric: Metric,
    pub current: f64,
    pub in_range: bool,
    /// Signed distance to the violated boundary (negative when low).
    pub deviation: f64,
    pub position: Position,
}

impl MetricEvaluation {
    #[must_use]
    pub fn new(metric: Metric, current: f64, range: Range) -> Self {
        let position = range.position(current);
        Self {
            metric,
            current,
            in_range: position == Position::Within,
            deviation: range.deviation(current),
            position,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conservative_target_from_below() {
        let range = Range::new(1.045, 1.060);
        let target = range.conservative_target(1.040).unwrap();
        assert!((target - 1.046_875).abs() < 1e-12);
        assert!(target > range.min && target < range.midpoint());
    }

    #[test]
    fn conservative_target_from_above() {
        let range = Range::new(30.0, 50.0);
        let target = range.conservative_target(65.0).unwrap();
        assert!((target - 47.5).abs() < 1e-12);
        assert!(target < range.max && target > range.midpoint());
    }

    #[test]
    fn conservative_target_strictly_inside_for_many_ranges() {
        let ranges = [
            Range::new(1.008, 1.016),
            Range::new(4.2, 5.5),
            Range::new(0.0, 1.0),
            Range::new(40.0, 100.0),
        ];
        for range in ranges {
            let mid = range.midpoint();
            let low = range.conservative_target(range.min - 1.0).unwrap();
            assert!(low > range.min && low < mid);
            let high = range.conservative_target(range.max + 1.0).unwrap();
            assert!(high < range.max && high > mid);
        }
    }

    #[test]
    fn in_range_value_has_no_target() {
        let range = Range::new(5.0, 10.0);
        assert_eq!(range.conservative_target(7.0), None);
        assert_eq!(range.conservative_target(5.0), None);
        assert_eq!(range.deviation(10.0), 0.0);
    }

    #[test]
    fn deviation_is_signed() {
        let range = Range::new(5.0, 10.0);
        assert_eq!(range.deviation(3.0), -2.0);
        assert_eq!(range.deviation(12.5), 2.5);
        assert_eq!(range.position(3.0), Position::Below);
        assert_eq!(range.position(12.5), Position::Above);
    }

    #[test]
    fn inverted_range_fails_validation() {
        let target = StyleTarget {
            style: "broken".into(),
            original_gravity: Range::new(1.060, 1.045),
            final_gravity: Range::new(1.010, 1.015),
            abv: Range::new(4.5, 6.2),
            ibu: Range::new(30.0, 50.0),
            srm: Range::new(5.0, 10.0),
        };
        let err = target.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidStyleTarget(_)));
        assert!(err.to_string().contains("OG"));
    }

    #[test]
    fn metric_display() {
        assert_eq!(Metric::OriginalGravity.to_string(), "OG");
        assert_eq!(Metric::Srm.to_string(), "SRM");
    }
}
