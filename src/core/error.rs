//! RC-002: Engine error taxonomy.
//!
//! Structural and validation failures surface before any step runs;
//! per-step failures are routed through the step's `on_error` policy and
//! never reach the caller as bare errors.

use super::types::SessionStatus;
use thiserror::Error;

/// All failure classes of the recipe engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Parse-time structural violation — the run never starts.
    #[error("malformed recipe: {0}")]
    MalformedRecipe(String),

    /// One or more blocking validation errors — the run never starts.
    #[error("recipe validation failed: {0}")]
    ValidationFailed(String),

    /// A template reference with no bound value at render time.
    #[error("unresolved variable '{0}'")]
    UnresolvedVariable(String),

    /// The external agent call failed after exhausting retries.
    #[error("agent invocation failed for step '{step}': {reason}")]
    AgentInvocation { step: String, reason: String },

    /// Resume requested for an unknown session id.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Resume requested for a session already in a terminal status.
    #[error("session '{id}' is {status}; only running sessions can be resumed")]
    SessionNotResumable { id: String, status: SessionStatus },

    /// Session store I/O or serialization failure.
    #[error("session store error: {0}")]
    Store(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc002_display_messages() {
        let e = EngineError::UnresolvedVariable("who".to_string());
        assert_eq!(e.to_string(), "unresolved variable 'who'");

        let e = EngineError::SessionNotFound("s-123".to_string());
        assert_eq!(e.to_string(), "session not found: s-123");

        let e = EngineError::SessionNotResumable {
            id: "s-123".to_string(),
            status: SessionStatus::Completed,
        };
        assert!(e.to_string().contains("COMPLETED"));
    }

    #[test]
    fn test_rc002_agent_invocation_message() {
        let e = EngineError::AgentInvocation {
            step: "scan".to_string(),
            reason: "exit code 2".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "agent invocation failed for step 'scan': exit code 2"
        );
    }
}
