//! Per-run derived metrics

use crate::experiment::ResultRow;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

/// Length of an expression in atomic symbols (Unicode scalar values).
#[must_use]
pub fn unique_entropy(expression: &str) -> u64 {
    expression.chars().count() as u64
}

/// Number of distinct symbols in an expression.
#[must_use]
pub fn unique_expressions_count(expression: &str) -> u64 {
    expression.chars().collect::<FxHashSet<char>>().len() as u64
}

/// One step of a [`DerivedSeries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedPoint {
    /// 0-based position of the row within its run
    pub time_step: u64,
    /// Symbol count of the expression
    pub unique_entropy: u64,
    /// Distinct-symbol count of the expression
    pub unique_expressions_count: u64,
}

/// Plot-ready columns computed from one run's rows.
///
/// Never persisted; rebuilding from the same rows always yields an equal value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedSeries {
    time_step: Vec<u64>,
    unique_entropy: Vec<u64>,
    unique_expressions_count: Vec<u64>,
}

impl DerivedSeries {
    /// Derive from expressions in row order. Each row is derived independently.
    pub fn from_expressions<I, E>(expressions: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: AsRef<str>,
    {
        let mut series = Self::default();
        for (step, expression) in expressions.into_iter().enumerate() {
            let expression = expression.as_ref();
            series.time_step.push(step as u64);
            series.unique_entropy.push(unique_entropy(expression));
            series
                .unique_expressions_count
                .push(unique_expressions_count(expression));
        }
        series
    }

    /// Assemble a series from precomputed points.
    pub fn from_points<I: IntoIterator<Item = DerivedPoint>>(points: I) -> Self {
        let mut series = Self::default();
        for point in points {
            series.time_step.push(point.time_step);
            series.unique_entropy.push(point.unique_entropy);
            series
                .unique_expressions_count
                .push(point.unique_expressions_count);
        }
        series
    }

    /// Derive from stored rows, in the order given.
    #[must_use]
    pub fn from_rows(rows: &[ResultRow]) -> Self {
        Self::from_expressions(rows.iter().map(ResultRow::expression))
    }

    /// Time step column
    #[must_use]
    pub fn time_step(&self) -> &[u64] {
        &self.time_step
    }

    /// Symbol-count column
    #[must_use]
    pub fn unique_entropy(&self) -> &[u64] {
        &self.unique_entropy
    }

    /// Distinct-symbol-count column
    #[must_use]
    pub fn unique_expressions_count(&self) -> &[u64] {
        &self.unique_expressions_count
    }

    /// Number of steps
    #[must_use]
    pub fn len(&self) -> usize {
        self.time_step.len()
    }

    /// True for a run with no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time_step.is_empty()
    }

    /// Row view over the three columns
    pub fn points(&self) -> impl Iterator<Item = DerivedPoint> + '_ {
        self.time_step
            .iter()
            .zip(&self.unique_entropy)
            .zip(&self.unique_expressions_count)
            .map(|((&time_step, &unique_entropy), &unique_expressions_count)| DerivedPoint {
                time_step,
                unique_entropy,
                unique_expressions_count,
            })
    }

    /// `min over t of (t - x)^2`, or `None` for an empty series.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn min_squared_distance(&self, x: f64) -> Option<f64> {
        self.time_step
            .iter()
            .map(|&t| {
                let d = t as f64 - x;
                d * d
            })
            .fold(None, |best: Option<f64>, d| {
                Some(best.map_or(d, |b| b.min(d)))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_formulas() {
        assert_eq!(unique_entropy("abc"), 3);
        assert_eq!(unique_expressions_count("abca"), 3);
        assert_eq!(unique_entropy(""), 0);
        assert_eq!(unique_expressions_count(""), 0);
    }

    #[test]
    fn test_symbols_are_chars_not_bytes() {
        assert_eq!(unique_entropy("λx.x"), 4);
        assert_eq!(unique_expressions_count("λx.x"), 3);
    }

    #[test]
    fn test_from_expressions() {
        let series = DerivedSeries::from_expressions(["ab", "abc"]);
        assert_eq!(series.time_step(), &[0, 1]);
        assert_eq!(series.unique_entropy(), &[2, 3]);
        assert_eq!(series.unique_expressions_count(), &[2, 3]);
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_empty_series() {
        let series = DerivedSeries::from_expressions(Vec::<String>::new());
        assert!(series.is_empty());
        assert_eq!(series.min_squared_distance(1.0), None);
    }

    #[test]
    fn test_points() {
        let series = DerivedSeries::from_expressions(["aab"]);
        let points: Vec<_> = series.points().collect();
        assert_eq!(
            points,
            vec![DerivedPoint {
                time_step: 0,
                unique_entropy: 3,
                unique_expressions_count: 2,
            }]
        );
    }

    #[test]
    fn test_min_squared_distance() {
        let series = DerivedSeries::from_expressions(["a", "a", "a"]);
        assert_eq!(series.min_squared_distance(1.0), Some(0.0));
        assert_eq!(series.min_squared_distance(4.0), Some(4.0));
        assert_eq!(series.min_squared_distance(-0.5), Some(0.25));
    }
}
