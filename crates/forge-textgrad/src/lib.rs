//! Forge TextGrad: judge feedback as textual gradients
//!
//! `backward` turns one judged run into a gradient string on each variable;
//! `step` reads the gradients back, proposes improvements for every failing
//! dimension and, in VALIDATED mode, applies only those that measurably help.

pub mod auto_apply;
pub mod engine;
pub mod gradient;
pub mod improvements;

pub use auto_apply::ROLLBACK_REASON;
pub use engine::{JudgeGradientEngine, JudgeGradientSettings};
pub use gradient::{format_gradient, parse_gradient_scores};
pub use improvements::{improvement_for_dimension, DimensionRule};
