//! Configuration surface for the optimizers
//!
//! Numeric fields use zero for "unset" so partially written YAML files load;
//! `with_defaults` fills the gaps before `validate` runs.

use crate::data_model::Example;
use crate::error::ForgeError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_MAX_BOOTSTRAPPED_DEMOS: i32 = 5;
pub const DEFAULT_MAX_LABELED_DEMOS: i32 = 8;
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;
pub const DEFAULT_MAX_ROUNDS: i32 = 1;
pub const DEFAULT_NUM_CANDIDATES: i32 = 10;
pub const DEFAULT_TASK_DESCRIPTION: &str = "Optimize agent instructions for improved performance";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Invalid(#[from] ForgeError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleprompterConfig {
    pub max_bootstrapped_demos: i32,
    pub max_labeled_demos: i32,
    /// Minimum metric score for a trace to count, in [0, 1]
    pub min_confidence: f64,
    pub max_rounds: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<TeacherConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mipro: Option<MiproConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeacherConfig {
    pub use_teacher: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiproConfig {
    /// Fixed candidates; when empty the instruction generator is asked
    pub instruction_candidates: Vec<String>,
    pub num_candidates: i32,
    pub task_description: String,
    /// Dimension weights used to pick the winning instruction
    pub dimension_priorities: BTreeMap<String, f64>,
}

impl MiproConfig {
    pub fn num_candidates_or_default(&self) -> usize {
        if self.num_candidates > 0 {
            self.num_candidates as usize
        } else {
            DEFAULT_NUM_CANDIDATES as usize
        }
    }

    pub fn task_description_or_default(&self) -> &str {
        if self.task_description.is_empty() {
            DEFAULT_TASK_DESCRIPTION
        } else {
            &self.task_description
        }
    }
}

impl TeleprompterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load, default and validate a YAML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml_str(&content)?.with_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Fill every unset (zero) field with its default
    pub fn with_defaults(mut self) -> Self {
        if self.max_bootstrapped_demos == 0 {
            self.max_bootstrapped_demos = DEFAULT_MAX_BOOTSTRAPPED_DEMOS;
        }
        if self.max_labeled_demos == 0 {
            self.max_labeled_demos = DEFAULT_MAX_LABELED_DEMOS;
        }
        if self.min_confidence == 0.0 {
            self.min_confidence = DEFAULT_MIN_CONFIDENCE;
        }
        if self.max_rounds == 0 {
            self.max_rounds = DEFAULT_MAX_ROUNDS;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ForgeError> {
        if self.max_bootstrapped_demos < 0 {
            return Err(ForgeError::InvalidConfig(
                "max_bootstrapped_demos must be non-negative".to_string(),
            ));
        }
        if self.max_labeled_demos < 0 {
            return Err(ForgeError::InvalidConfig(
                "max_labeled_demos must be non-negative".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ForgeError::InvalidConfig(
                "min_confidence must be in [0, 1]".to_string(),
            ));
        }
        if self.max_rounds < 1 {
            return Err(ForgeError::InvalidConfig(
                "max_rounds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_bootstrapped(&self) -> usize {
        self.max_bootstrapped_demos.max(0) as usize
    }

    pub fn uses_teacher(&self) -> bool {
        self.teacher.as_ref().map(|t| t.use_teacher).unwrap_or(false)
    }

    pub fn dimension_priorities(&self) -> Option<&BTreeMap<String, f64>> {
        self.mipro
            .as_ref()
            .map(|m| &m.dimension_priorities)
            .filter(|p| !p.is_empty())
    }
}

/// Governs what `Step` does with the improvements it synthesizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AutoApplyMode {
    /// Return improvements, apply nothing
    #[default]
    Manual,
    /// Declared only; behaves like Manual
    DryRun,
    /// Apply one by one, keep only those that raise the validation score
    Validated,
    /// Declared only; behaves like Manual
    Autonomous,
}

impl std::fmt::Display for AutoApplyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            AutoApplyMode::Manual => write!(f, "MANUAL"),
            AutoApplyMode::DryRun => write!(f, "DRY_RUN"),
            AutoApplyMode::Validated => write!(f, "VALIDATED"),
            AutoApplyMode::Autonomous => write!(f, "AUTONOMOUS"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub validation_set: Vec<Example>,
    /// Minimum gain (0-100 scale) an improvement must bring to be kept
    pub min_score_delta: f64,
    /// Roll back when re-validation itself errors
    pub rollback_on_failure: bool,
}

impl ValidationConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&content)
    }
}
