//! Forge Teleprompter: prompt and demonstration optimizers
//!
//! - `BootstrapFewShot` picks demonstrations from the agent's own best runs
//! - `Mipro` searches over instruction candidates
//! - `Copro` is declared but not implemented

pub mod base;
pub mod bootstrap;
pub mod copro;
pub mod mipro;
pub mod registry;
pub mod selector;
pub mod teleprompter;
pub mod text;

pub use base::{BaseTeleprompter, CompilationOutcome};
pub use bootstrap::BootstrapFewShot;
pub use copro::Copro;
pub use mipro::{InstructionCandidate, Mipro};
pub use registry::Registry;
pub use selector::{
    BootstrapStrategy, DemonstrationSelector, DiverseSelector, RecentSelector,
    RepresentativeSelector, TopKSelector,
};
pub use teleprompter::{CompileRequest, Teleprompter};
