//! RC-008: Agent-invocation interface.
//!
//! The executor performs a step's actual work through this single-method
//! capability seam. It is injected at construction rather than looked up
//! through ambient state, so the state machine is testable with an
//! in-process fake.

pub mod process;

pub use process::CommandInvoker;

use async_trait::async_trait;
use indexmap::IndexMap;
use thiserror::Error;

/// Everything an agent call receives for one step.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Namespaced agent reference (e.g. `amplifier/researcher`)
    pub agent: String,

    /// Fully rendered prompt — no placeholders remain
    pub prompt: String,

    /// Opaque mode tag from the step, if any
    pub mode: Option<String>,

    /// Opaque per-step configuration overrides
    pub config: Option<IndexMap<String, serde_yaml_ng::Value>>,

    /// Timeout passthrough; enforcement is the callee's concern
    pub timeout_seconds: Option<u64>,
}

/// Failure of one agent invocation. The executor treats it as a step
/// failure eligible for retry and the step's `on_error` policy.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct InvokeError(pub String);

/// External capability that executes one step and returns its output
/// text. The engine never inspects the output beyond storing it as a
/// string-valued context variable.
#[async_trait]
pub trait AgentInvoker: Send + Sync {
    async fn invoke(&self, request: &InvocationRequest) -> Result<String, InvokeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc008_invoke_error_display() {
        let e = InvokeError("spawn failed: not found".to_string());
        assert_eq!(e.to_string(), "spawn failed: not found");
    }

    #[test]
    fn test_rc008_request_clone_keeps_fields() {
        let request = InvocationRequest {
            agent: "amplifier/writer".to_string(),
            prompt: "write".to_string(),
            mode: Some("concise".to_string()),
            config: None,
            timeout_seconds: Some(600),
        };
        let copy = request.clone();
        assert_eq!(copy.agent, "amplifier/writer");
        assert_eq!(copy.mode.as_deref(), Some("concise"));
        assert_eq!(copy.timeout_seconds, Some(600));
    }
}
