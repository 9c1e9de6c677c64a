//! Forge Judge: metrics backed by the multi-judge orchestrator
//!
//! Turns an example and an agent result into an evaluation request, sends it
//! to the judges and folds their verdicts into a single [0, 1] score.

pub mod aggregate;
pub mod exact_match;
pub mod multi_judge;
pub mod request;

pub use aggregate::{weighted_dimension_score, DimensionAggregator, DimensionSummary};
pub use exact_match::ExactMatchMetric;
pub use multi_judge::{MultiJudgeMetric, MultiJudgeMetricConfig};
pub use request::{build_metadata, build_request, extract_query, extract_response};
