//! Call Context: cancellation and deadline shared by every collaborator call
use crate::error::ForgeError;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Context handed to every agent, metric, judge and learning-agent call.
///
/// Clones share the cancellation flag, so cancelling any clone cancels the
/// whole call tree. Collaborators are expected to honour `check()` for
/// long-running work; the optimizers call it before each collaborator call.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub trace_id: String,
    pub metadata: HashMap<String, Value>,
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl CallContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            metadata: HashMap::new(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Derive a context whose deadline is at most `timeout` from now
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let candidate = Instant::now() + timeout;
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < candidate => existing,
            _ => candidate,
        });
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Same trace id and metadata, but no deadline and its own cancellation
    /// flag. For compensating calls that must go out after the caller gave up.
    pub fn detached(&self) -> Self {
        Self {
            trace_id: self.trace_id.clone(),
            metadata: self.metadata.clone(),
            deadline: None,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Fails once the context is cancelled or past its deadline
    pub fn check(&self) -> Result<(), ForgeError> {
        if self.is_cancelled() {
            return Err(ForgeError::Cancelled(format!(
                "context {} cancelled",
                self.trace_id
            )));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(ForgeError::DeadlineExceeded(format!(
                    "context {} deadline exceeded",
                    self.trace_id
                )));
            }
        }
        Ok(())
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes_check() {
        let ctx = CallContext::new();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = CallContext::new();
        let child = ctx.clone();
        ctx.cancel();
        assert!(child.is_cancelled());
        assert!(matches!(child.check(), Err(ForgeError::Cancelled(_))));
    }

    #[test]
    fn test_detached_ignores_parent_cancellation() {
        let ctx = CallContext::new()
            .with_timeout(Duration::from_secs(5))
            .with_metadata("agent_id", Value::from("sql-agent"));
        ctx.cancel();

        let detached = ctx.detached();
        assert!(detached.check().is_ok());
        assert!(detached.deadline().is_none());
        assert_eq!(detached.trace_id, ctx.trace_id);
        assert_eq!(detached.metadata["agent_id"], "sql-agent");

        detached.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = CallContext::new().with_deadline(Instant::now() - Duration::from_millis(1));
        assert!(matches!(ctx.check(), Err(ForgeError::DeadlineExceeded(_))));
    }

    #[test]
    fn test_with_timeout_never_extends_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(10));
        let first = ctx.deadline().unwrap();
        let ctx = ctx.with_timeout(Duration::from_secs(60));
        assert_eq!(ctx.deadline(), Some(first));
    }
}
