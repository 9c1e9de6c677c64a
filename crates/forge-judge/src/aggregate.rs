//! Dimension score aggregation
//!
//! Collects per-dimension judge scores across traces and
//! reduces them to means.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Running per-dimension sums
#[derive(Debug, Clone, Default)]
pub struct DimensionAggregator {
    sums: BTreeMap<String, (f64, usize)>,
    samples: usize,
}

impl DimensionAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one trace worth of dimension scores
    pub fn add(&mut self, scores: &BTreeMap<String, f64>) {
        for (dimension, score) in scores {
            let entry = self.sums.entry(dimension.clone()).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
        self.samples += 1;
    }

    /// Mean per dimension; a dimension is averaged only over the samples that reported it
    pub fn averages(&self) -> BTreeMap<String, f64> {
        self.sums
            .iter()
            .map(|(dimension, (sum, count))| (dimension.clone(), sum / *count as f64))
            .collect()
    }

    pub fn summary(&self) -> DimensionSummary {
        let averages = self.averages();
        let weakest = averages
            .iter()
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(d, s)| (d.clone(), *s));
        DimensionSummary {
            sample_count: self.samples,
            averages,
            weakest,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionSummary {
    pub sample_count: usize,
    pub averages: BTreeMap<String, f64>,
    /// Lowest-scoring dimension, ties broken by name
    pub weakest: Option<(String, f64)>,
}

/// Priority-weighted score of a dimension map, in [0, 1].
///
/// Scores above 1.0 are read as 0-100 and scaled down first. `None` when no
/// weighted dimension is present (or the matching weights sum to zero).
pub fn weighted_dimension_score(
    scores: &BTreeMap<String, f64>,
    weights: &BTreeMap<String, f64>,
) -> Option<f64> {
    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for (dimension, weight) in weights {
        if let Some(score) = scores.get(dimension) {
            let normalized = if *score > 1.0 { score / 100.0 } else { *score };
            weighted_sum += normalized * weight;
            total_weight += weight;
        }
    }
    if total_weight == 0.0 {
        None
    } else {
        Some(weighted_sum / total_weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_averages_only_over_reporting_samples() {
        let mut agg = DimensionAggregator::new();
        agg.add(&scores(&[("quality", 80.0), ("safety", 60.0)]));
        agg.add(&scores(&[("quality", 90.0)]));

        let averages = agg.averages();
        assert_eq!(averages.get("quality"), Some(&85.0));
        assert_eq!(averages.get("safety"), Some(&60.0));
        assert_eq!(averages.get("cost"), None);
        assert_eq!(agg.summary().sample_count, 2);
    }

    #[test]
    fn test_summary_weakest() {
        let mut agg = DimensionAggregator::new();
        agg.add(&scores(&[("cost", 55.0)]));
        agg.add(&scores(&[("quality", 92.0), ("safety", 55.0)]));
        let summary = agg.summary();
        assert_eq!(summary.sample_count, 2);
        // tie on 55 goes to the first name
        assert_eq!(summary.weakest, Some(("cost".to_string(), 55.0)));
    }

    #[test]
    fn test_empty_summary() {
        let summary = DimensionAggregator::new().summary();
        assert_eq!(summary.sample_count, 0);
        assert!(summary.weakest.is_none());
    }

    #[test]
    fn test_weighted_dimension_score_normalizes_percentages() {
        let weights = scores(&[("quality", 2.0), ("cost", 1.0)]);
        let score = weighted_dimension_score(&scores(&[("quality", 95.0), ("cost", 60.0)]), &weights)
            .unwrap();
        assert!((score - 0.8333).abs() < 0.001);

        let fractional =
            weighted_dimension_score(&scores(&[("quality", 0.95), ("cost", 0.60)]), &weights)
                .unwrap();
        assert!((fractional - score).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_dimension_score_without_match() {
        let weights = scores(&[("safety", 1.0)]);
        assert_eq!(weighted_dimension_score(&scores(&[("quality", 90.0)]), &weights), None);
    }
}
