use crate::teleprompter::{CompileRequest, Teleprompter};
use forge_core::{CallContext, CompilationResult, ForgeError, TeleprompterType};

/// Coordinate prompt optimization. Not implemented; `compile` always fails.
#[derive(Debug, Default)]
pub struct Copro;

impl Copro {
    pub fn new() -> Self {
        Self
    }
}

impl Teleprompter for Copro {
    fn compile(
        &self,
        _ctx: &CallContext,
        _request: &CompileRequest,
    ) -> Result<CompilationResult, ForgeError> {
        Err(ForgeError::Unimplemented(
            "COPRO teleprompter is not implemented".to_string(),
        ))
    }

    fn teleprompter_type(&self) -> TeleprompterType {
        TeleprompterType::Copro
    }

    fn name(&self) -> &'static str {
        "COPRO"
    }

    fn supports_multi_round(&self) -> bool {
        true
    }

    fn supports_teacher(&self) -> bool {
        false
    }
}
