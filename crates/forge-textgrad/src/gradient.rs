//! Textual gradient format
//!
//! ```text
//! [Dimension Scores]
//! quality: 75/100
//! safety: 65/100 ⚠️
//!
//! Overall Score: 70.0/100 ✗
//!
//! [Suggestions]
//! - safety (65/100): Validate user-supplied table names
//! ```
//!
//! Dimension lines are sorted by name; suggestions follow verdict order, then
//! dimension name. Only the `[Dimension Scores]` block is read back.

use forge_core::EvaluateResponse;
use lazy_static::lazy_static;
use regex::Regex;
use std::fmt::Write;

pub const SCORES_HEADER: &str = "[Dimension Scores]";
pub const SUGGESTIONS_HEADER: &str = "[Suggestions]";
const OVERALL_PREFIX: &str = "Overall Score:";

/// Dimension averages below this get a warning marker
pub const WARN_BELOW: f64 = 70.0;
/// Dimension averages at or above this get a check mark
pub const GOOD_AT: f64 = 90.0;
/// Per-verdict dimension scores below this produce a suggestion line
pub const SUGGEST_BELOW: f64 = 80.0;

lazy_static! {
    /// `name: 75/100`, optionally followed by a status marker
    static ref SCORE_LINE: Regex =
        Regex::new(r"^([^:]+):\s*(-?[0-9]+(?:\.[0-9]+)?)/100").unwrap();
}

fn status_marker(average: f64) -> &'static str {
    if average < WARN_BELOW {
        " ⚠️"
    } else if average >= GOOD_AT {
        " ✓"
    } else {
        ""
    }
}

/// Render a judge response as gradient text
pub fn format_gradient(response: &EvaluateResponse) -> String {
    let mut out = String::new();
    out.push_str(SCORES_HEADER);
    out.push('\n');

    for (dimension, average) in response.dimension_averages() {
        let _ = writeln!(out, "{}: {:.0}/100{}", dimension, average, status_marker(average));
    }

    let _ = write!(out, "\n{} {:.1}/100", OVERALL_PREFIX, response.final_score);
    out.push_str(if response.passed { " ✓\n" } else { " ✗\n" });

    out.push('\n');
    out.push_str(SUGGESTIONS_HEADER);
    out.push('\n');

    for verdict in &response.verdicts {
        if verdict.reasoning.is_empty() {
            continue;
        }
        for (dimension, score) in &verdict.dimension_scores {
            if *score < SUGGEST_BELOW {
                let _ = writeln!(out, "- {} ({:.0}/100): {}", dimension, score, verdict.reasoning);
            }
        }
    }

    out
}

/// Read `(dimension, score)` pairs back from the `[Dimension Scores]` block,
/// in the order they appear. The block ends at the first blank line or the
/// next `[` header.
pub fn parse_gradient_scores(gradient: &str) -> Vec<(String, f64)> {
    let mut scores = Vec::new();
    let mut in_scores = false;

    for line in gradient.lines() {
        let line = line.trim();
        if line == SCORES_HEADER {
            in_scores = true;
            continue;
        }
        if !in_scores {
            continue;
        }
        if line.is_empty() || line.starts_with('[') {
            break;
        }
        if line.starts_with(OVERALL_PREFIX) || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = SCORE_LINE.captures(line) {
            let dimension = caps[1].trim();
            if let Ok(score) = caps[2].parse::<f64>() {
                scores.push((dimension.to_string(), score));
            }
        }
    }

    scores
}
