//! Demonstration selectors
//!
//! Pure functions from scored traces to demonstrations. Sorting is stable, so
//! traces with equal keys keep their trainset order.

use crate::text::word_overlap;
use forge_core::{format_fields, Demonstration, ExecutionTrace, ForgeError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_DIVERSITY_THRESHOLD: f64 = 0.3;
pub const REPRESENTATIVE_DIVERSITY_THRESHOLD: f64 = 0.4;
pub const DEFAULT_NUM_CLUSTERS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BootstrapStrategy {
    #[default]
    TopK,
    Diverse,
    Recent,
    Representative,
}

impl fmt::Display for BootstrapStrategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BootstrapStrategy::TopK => write!(f, "TOP_K"),
            BootstrapStrategy::Diverse => write!(f, "DIVERSE"),
            BootstrapStrategy::Recent => write!(f, "RECENT"),
            BootstrapStrategy::Representative => write!(f, "REPRESENTATIVE"),
        }
    }
}

pub trait DemonstrationSelector: Send + Sync {
    /// At most `max_demos` demonstrations; fails on an empty trace list
    fn select(
        &self,
        traces: &[ExecutionTrace],
        max_demos: usize,
    ) -> Result<Vec<Demonstration>, ForgeError>;

    fn strategy(&self) -> BootstrapStrategy;
}

fn require_traces(traces: &[ExecutionTrace]) -> Result<(), ForgeError> {
    if traces.is_empty() {
        return Err(ForgeError::Selection("no traces provided".to_string()));
    }
    Ok(())
}

fn by_score_desc(traces: &[ExecutionTrace]) -> Vec<&ExecutionTrace> {
    let mut sorted: Vec<&ExecutionTrace> = traces.iter().collect();
    sorted.sort_by(|a, b| b.quality_score.total_cmp(&a.quality_score));
    sorted
}

/// Highest quality scores first
#[derive(Debug, Clone, Copy, Default)]
pub struct TopKSelector;

impl DemonstrationSelector for TopKSelector {
    fn select(
        &self,
        traces: &[ExecutionTrace],
        max_demos: usize,
    ) -> Result<Vec<Demonstration>, ForgeError> {
        require_traces(traces)?;
        Ok(by_score_desc(traces)
            .into_iter()
            .take(max_demos)
            .map(Demonstration::from_trace)
            .collect())
    }

    fn strategy(&self) -> BootstrapStrategy {
        BootstrapStrategy::TopK
    }
}

/// Greedy by score, skipping traces too close to one already picked
#[derive(Debug, Clone, Copy)]
pub struct DiverseSelector {
    /// Minimum distance (1 - similarity) from every selected trace
    threshold: f64,
}

impl DiverseSelector {
    /// A zero threshold means the default of 0.3
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold == 0.0 {
            DEFAULT_DIVERSITY_THRESHOLD
        } else {
            threshold
        };
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Mean of input and output word overlap
    pub fn similarity(a: &ExecutionTrace, b: &ExecutionTrace) -> f64 {
        let inputs = word_overlap(
            &format_fields(&a.example.inputs),
            &format_fields(&b.example.inputs),
        );
        let outputs = word_overlap(
            &format_fields(&a.result.outputs),
            &format_fields(&b.result.outputs),
        );
        (inputs + outputs) / 2.0
    }

    fn is_sufficiently_different(&self, candidate: &ExecutionTrace, selected: &[&ExecutionTrace]) -> bool {
        let max_similarity = 1.0 - self.threshold;
        selected
            .iter()
            .all(|s| Self::similarity(candidate, s) <= max_similarity)
    }
}

impl Default for DiverseSelector {
    fn default() -> Self {
        Self::new(DEFAULT_DIVERSITY_THRESHOLD)
    }
}

impl DemonstrationSelector for DiverseSelector {
    fn select(
        &self,
        traces: &[ExecutionTrace],
        max_demos: usize,
    ) -> Result<Vec<Demonstration>, ForgeError> {
        require_traces(traces)?;
        if max_demos == 0 {
            return Ok(Vec::new());
        }

        let sorted = by_score_desc(traces);
        let mut selected: Vec<&ExecutionTrace> = vec![sorted[0]];
        for candidate in sorted.into_iter().skip(1) {
            if selected.len() >= max_demos {
                break;
            }
            if self.is_sufficiently_different(candidate, &selected) {
                selected.push(candidate);
            }
        }

        Ok(selected.into_iter().map(Demonstration::from_trace).collect())
    }

    fn strategy(&self) -> BootstrapStrategy {
        BootstrapStrategy::Diverse
    }
}

/// Newest traces first
#[derive(Debug, Clone, Copy, Default)]
pub struct RecentSelector;

impl DemonstrationSelector for RecentSelector {
    fn select(
        &self,
        traces: &[ExecutionTrace],
        max_demos: usize,
    ) -> Result<Vec<Demonstration>, ForgeError> {
        require_traces(traces)?;
        let mut sorted: Vec<&ExecutionTrace> = traces.iter().collect();
        sorted.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(sorted
            .into_iter()
            .take(max_demos)
            .map(Demonstration::from_trace)
            .collect())
    }

    fn strategy(&self) -> BootstrapStrategy {
        BootstrapStrategy::Recent
    }
}

/// Placeholder for cluster-based selection: runs the diversity heuristic
/// with a stricter threshold. `num_clusters` is carried but not used.
#[derive(Debug, Clone, Copy)]
pub struct RepresentativeSelector {
    num_clusters: usize,
}

impl RepresentativeSelector {
    pub fn new(num_clusters: usize) -> Self {
        let num_clusters = if num_clusters == 0 {
            DEFAULT_NUM_CLUSTERS
        } else {
            num_clusters
        };
        Self { num_clusters }
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }
}

impl Default for RepresentativeSelector {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_CLUSTERS)
    }
}

impl DemonstrationSelector for RepresentativeSelector {
    fn select(
        &self,
        traces: &[ExecutionTrace],
        max_demos: usize,
    ) -> Result<Vec<Demonstration>, ForgeError> {
        DiverseSelector::new(REPRESENTATIVE_DIVERSITY_THRESHOLD).select(traces, max_demos)
    }

    fn strategy(&self) -> BootstrapStrategy {
        BootstrapStrategy::Representative
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use forge_core::{Example, ExecutionResult, FieldMap};

    fn trace(id: &str, question: &str, answer: &str, score: f64, age_secs: i64) -> ExecutionTrace {
        let example = Example::new(id).with_input("question", question);
        let mut result = ExecutionResult {
            trace_id: id.to_string(),
            success: true,
            ..Default::default()
        };
        result.outputs.insert("answer".to_string(), answer.to_string());
        ExecutionTrace {
            trace_id: id.to_string(),
            example,
            result,
            quality_score: score,
            timestamp: Utc::now() - Duration::seconds(age_secs),
            metadata: FieldMap::new(),
            dimension_scores: None,
            judge_verdicts: None,
        }
    }

    #[test]
    fn test_top_k_orders_by_score() {
        let traces = vec![
            trace("a", "q1", "a1", 0.9, 0),
            trace("b", "q2", "a2", 0.5, 0),
            trace("c", "q3", "a3", 0.95, 0),
        ];
        let demos = TopKSelector.select(&traces, 2).unwrap();
        let scores: Vec<f64> = demos.iter().map(|d| d.confidence).collect();
        assert_eq!(scores, vec![0.95, 0.9]);
    }

    #[test]
    fn test_top_k_caps_at_trace_count() {
        let traces = vec![trace("a", "q", "a", 0.8, 0)];
        assert_eq!(TopKSelector.select(&traces, 5).unwrap().len(), 1);
    }

    #[test]
    fn test_empty_traces_rejected() {
        for selector in [
            &TopKSelector as &dyn DemonstrationSelector,
            &DiverseSelector::default(),
            &RecentSelector,
            &RepresentativeSelector::default(),
        ] {
            let err = selector.select(&[], 3).unwrap_err();
            assert_eq!(err, ForgeError::Selection("no traces provided".to_string()));
        }
    }

    #[test]
    fn test_recent_orders_by_timestamp() {
        let traces = vec![
            trace("old", "q1", "a1", 0.99, 300),
            trace("new", "q2", "a2", 0.71, 10),
            trace("mid", "q3", "a3", 0.80, 100),
        ];
        let demos = RecentSelector.select(&traces, 2).unwrap();
        let inputs: Vec<&str> = demos.iter().map(|d| d.input.as_str()).collect();
        assert_eq!(inputs, vec!["q2", "q3"]);
    }

    #[test]
    fn test_diverse_skips_near_duplicates() {
        let traces = vec![
            trace("a", "count active users", "42", 0.95, 0),
            trace("b", "count active users", "42", 0.90, 0),
            trace("c", "list recent orders", "none", 0.80, 0),
        ];
        let demos = DiverseSelector::default().select(&traces, 3).unwrap();
        let inputs: Vec<&str> = demos.iter().map(|d| d.input.as_str()).collect();
        assert_eq!(inputs, vec!["count active users", "list recent orders"]);
    }

    #[test]
    fn test_diverse_always_keeps_best() {
        let traces = vec![
            trace("a", "same", "same", 0.7, 0),
            trace("b", "same", "same", 0.99, 0),
        ];
        let demos = DiverseSelector::default().select(&traces, 2).unwrap();
        assert_eq!(demos.len(), 1);
        assert_eq!(demos[0].confidence, 0.99);
    }

    #[test]
    fn test_zero_demos_selects_nothing() {
        let traces = vec![
            trace("a", "count active users", "42", 0.95, 0),
            trace("b", "list recent orders", "none", 0.80, 0),
        ];
        // no seed trace either: a zero budget is honoured as zero
        assert!(DiverseSelector::default().select(&traces, 0).unwrap().is_empty());
        assert!(RepresentativeSelector::default().select(&traces, 0).unwrap().is_empty());
        assert!(TopKSelector.select(&traces, 0).unwrap().is_empty());
    }

    #[test]
    fn test_diverse_zero_threshold_uses_default() {
        assert_eq!(DiverseSelector::new(0.0).threshold(), 0.3);
        assert_eq!(RepresentativeSelector::new(0).num_clusters(), 5);
    }

    #[test]
    fn test_representative_is_stricter_diversity() {
        // similarity (0.5 + 0) / 2 = 0.25: passes 0.7 cap (Diverse) and 0.6 cap (Representative)
        let traces = vec![
            trace("a", "a b c", "x", 0.9, 0),
            trace("b", "b c d", "y", 0.8, 0),
        ];
        assert_eq!(RepresentativeSelector::default().select(&traces, 2).unwrap().len(), 2);

        // similarity (1 + 0.5) / 2 = 0.75: rejected by both
        let close = vec![
            trace("a", "a b c", "x y", 0.9, 0),
            trace("b", "a b c", "x z y q", 0.8, 0),
        ];
        assert_eq!(DiverseSelector::default().select(&close, 2).unwrap().len(), 1);
    }
}
