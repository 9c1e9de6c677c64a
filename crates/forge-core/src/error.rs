//! Unified Error Model
//!
//! Every failure carries an upper-case category prefix so an operator can
//! tell a missing dependency from an exhausted batch at a glance.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForgeError {
    #[error("CONFIG/{0}")]
    InvalidConfig(String),

    /// A collaborator or setting required before any work can start
    #[error("MISSING/{0}")]
    MissingDependency(String),

    #[error("AGENT/{0}")]
    Agent(String),

    #[error("MEMORY/{0}")]
    Memory(String),

    #[error("JUDGE/{0}")]
    Judge(String),

    #[error("METRIC/{0}")]
    Metric(String),

    #[error("SELECT/{0}")]
    Selection(String),

    #[error("TRANSPORT/{0}")]
    Transport(String),

    #[error("CANCELLED/{0}")]
    Cancelled(String),

    #[error("DEADLINE/{0}")]
    DeadlineExceeded(String),

    /// A batch in which no item produced a usable result
    #[error("EMPTY/{0}")]
    NoUsableResults(String),

    #[error("VALIDATION/{0}")]
    Validation(String),

    #[error("UNIMPLEMENTED/{0}")]
    Unimplemented(String),

    #[error("baseline validation failed: {0}")]
    BaselineValidation(Box<ForgeError>),

    #[error("failed to update learned layer: {0}")]
    LearnedLayerUpdate(Box<ForgeError>),

    #[error("judge evaluation failed: {0}")]
    JudgeEvaluation(Box<ForgeError>),
}

impl ForgeError {
    pub fn missing(what: impl Into<String>) -> Self {
        Self::MissingDependency(what.into())
    }

    pub fn empty(what: impl Into<String>) -> Self {
        Self::NoUsableResults(what.into())
    }

    /// True for errors raised by the call context rather than a collaborator
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled(_) | Self::DeadlineExceeded(_) => true,
            Self::BaselineValidation(inner)
            | Self::LearnedLayerUpdate(inner)
            | Self::JudgeEvaluation(inner) => inner.is_cancellation(),
            _ => false,
        }
    }
}
