//! RC-001: All types from the receta specification.
//!
//! Defines the recipe document schema, session records, validation results,
//! and provenance events. All persisted types derive Serialize/Deserialize
//! for YAML/JSON roundtripping.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Recipe document
// ============================================================================

/// A recipe — a named, versioned, ordered workflow of agent steps.
/// Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    /// Recipe name (alphanumeric plus hyphens/underscores)
    pub name: String,

    /// Semantic version (MAJOR.MINOR.PATCH)
    pub version: String,

    /// Optional description
    #[serde(default)]
    pub description: Option<String>,

    /// Optional author
    #[serde(default)]
    pub author: Option<String>,

    /// Informational tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Recipe-level default variables, overridable at invocation
    #[serde(default)]
    pub context: IndexMap<String, serde_yaml_ng::Value>,

    /// Ordered steps (must be non-empty)
    pub steps: Vec<Step>,
}

impl Recipe {
    /// Get a step by id.
    pub fn step(&self, id: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// A single unit of work — one agent invocation producing one named output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    /// Unique id within the recipe; also the context variable name for
    /// this step's output
    pub id: String,

    /// Namespaced agent reference, resolved lazily by the invoker
    pub agent: String,

    /// Prompt template with `{{variable}}` placeholders
    pub prompt: String,

    /// Opaque mode tag passed through to the agent call
    #[serde(default)]
    pub mode: Option<String>,

    /// Failure policy for this step
    #[serde(default)]
    pub on_error: OnError,

    /// Bounded retry for transient failures
    #[serde(default)]
    pub retry: Option<RetryPolicy>,

    /// Opaque per-step agent configuration overrides
    #[serde(default)]
    pub agent_config: Option<IndexMap<String, serde_yaml_ng::Value>>,

    /// Timeout passthrough — enforced by the agent interface, not here
    #[serde(default)]
    pub timeout_seconds: Option<u64>,

    /// Declared ordering edges; validated but execution is sequential
    /// by position
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Per-step failure policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Fail the whole run (default)
    #[default]
    Abort,
    /// Record an error marker and proceed to the next step
    Continue,
    /// Truncate the run; session completes partially
    SkipRemaining,
    /// Unrecognized tag in the document — rejected by the validator
    #[serde(other)]
    Unknown,
}

impl fmt::Display for OnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "abort"),
            Self::Continue => write!(f, "continue"),
            Self::SkipRemaining => write!(f, "skip_remaining"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Bounded retry policy for transient step failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first (must be >= 1)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay growth between attempts
    #[serde(default)]
    pub backoff: Backoff,

    /// Base delay in seconds (must be >= 0)
    #[serde(default = "default_retry_delay")]
    pub delay_seconds: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff: Backoff::default(),
            delay_seconds: default_retry_delay(),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.delay_seconds.max(0.0);
        let secs = match self.backoff {
            Backoff::Linear => base * f64::from(attempt),
            Backoff::Exponential => {
                base * f64::from(2u32.saturating_pow(attempt.saturating_sub(1)))
            }
        };
        Duration::from_secs_f64(secs)
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_delay() -> f64 {
    1.0
}

/// Backoff strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    #[default]
    Exponential,
    Linear,
}

// ============================================================================
// Validation
// ============================================================================

/// Output of the validator — errors block execution, warnings do not.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Session record
// ============================================================================

/// Durable record of one execution attempt of a recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Schema version
    pub schema: String,

    /// Globally unique id (embeds timestamp and random component)
    pub session_id: String,

    /// Recipe name at creation time
    pub recipe_name: String,

    /// Recipe version at creation time
    pub recipe_version: String,

    /// Project the run belongs to
    pub project_path: PathBuf,

    /// When the session was created
    pub started_at: DateTime<Utc>,

    /// Refreshed on every persist
    pub updated_at: DateTime<Utc>,

    /// Generator version
    pub generator: String,

    /// Execution status
    pub status: SessionStatus,

    /// Variable name -> value: invocation inputs plus completed step outputs
    #[serde(default)]
    pub context: IndexMap<String, String>,

    /// Ordered, append-only list of processed step ids
    #[serde(default)]
    pub completed_steps: Vec<String>,
}

impl Session {
    /// Whether a step id is already recorded as processed.
    pub fn is_completed(&self, step_id: &str) -> bool {
        self.completed_steps.iter().any(|id| id == step_id)
    }
}

/// Session lifecycle status. Immutable once it leaves `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Failed,
    /// Reserved for hosts that cancel a run explicitly; the engine
    /// itself never sets it — interruption leaves a running checkpoint.
    Aborted,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "RUNNING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Aborted => write!(f, "ABORTED"),
        }
    }
}

/// One row of `SessionStore::list` output.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    pub session_id: String,
    pub recipe_name: String,
    pub recipe_version: String,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub completed_steps: usize,
}

// ============================================================================
// Provenance events
// ============================================================================

/// Provenance event for the per-session JSONL event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    RunStarted {
        session: String,
        recipe: String,
        receta_version: String,
    },
    StepStarted {
        session: String,
        step: String,
        agent: String,
        attempt: u32,
    },
    StepCompleted {
        session: String,
        step: String,
        duration_seconds: f64,
    },
    StepFailed {
        session: String,
        step: String,
        error: String,
    },
    StepsSkipped {
        session: String,
        after: String,
        skipped: Vec<String>,
    },
    RunCompleted {
        session: String,
        status: String,
        steps_completed: u32,
        steps_failed: u32,
        total_seconds: f64,
    },
}

/// Timestamped event wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimestampedEvent {
    pub ts: String,
    #[serde(flatten)]
    pub event: RunEvent,
}

// ============================================================================
// Template helper
// ============================================================================

/// Convert a serde_yaml_ng::Value to a string for context seeding.
pub fn yaml_value_to_string(val: &serde_yaml_ng::Value) -> String {
    match val {
        serde_yaml_ng::Value::String(s) => s.clone(),
        serde_yaml_ng::Value::Number(n) => n.to_string(),
        serde_yaml_ng::Value::Bool(b) => b.to_string(),
        serde_yaml_ng::Value::Null => String::new(),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rc001_recipe_parse() {
        let yaml = r#"
name: summarize-repo
version: "1.2.0"
description: "Summarize a repository"
tags: [docs, agents]
context:
  depth: 2
steps:
  - id: scan
    agent: amplifier/scanner
    prompt: "Scan {{target}} to depth {{depth}}"
  - id: summarize
    agent: amplifier/writer
    prompt: "Summarize: {{scan}}"
    mode: concise
    on_error: continue
"#;
        let recipe: Recipe = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(recipe.name, "summarize-repo");
        assert_eq!(recipe.version, "1.2.0");
        assert_eq!(recipe.steps.len(), 2);
        assert_eq!(recipe.steps[0].on_error, OnError::Abort);
        assert_eq!(recipe.steps[1].on_error, OnError::Continue);
        assert_eq!(recipe.steps[1].mode.as_deref(), Some("concise"));
        assert_eq!(
            recipe.context["depth"],
            serde_yaml_ng::Value::Number(serde_yaml_ng::Number::from(2))
        );
    }

    #[test]
    fn test_rc001_step_defaults() {
        let yaml = r#"
id: s1
agent: a/b
prompt: "hi"
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(step.on_error, OnError::Abort);
        assert!(step.retry.is_none());
        assert!(step.mode.is_none());
        assert!(step.agent_config.is_none());
        assert!(step.depends_on.is_empty());
    }

    #[test]
    fn test_rc001_on_error_unknown_tag() {
        let yaml = r#"
id: s1
agent: a/b
prompt: "hi"
on_error: explode
"#;
        let step: Step = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(step.on_error, OnError::Unknown);
    }

    #[test]
    fn test_rc001_on_error_display() {
        assert_eq!(OnError::Abort.to_string(), "abort");
        assert_eq!(OnError::SkipRemaining.to_string(), "skip_remaining");
    }

    #[test]
    fn test_rc001_retry_defaults() {
        let policy: RetryPolicy = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff, Backoff::Exponential);
        assert!((policy.delay_seconds - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rc001_retry_delay_exponential() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Backoff::Exponential,
            delay_seconds: 1.0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
    }

    #[test]
    fn test_rc001_retry_delay_linear() {
        let policy = RetryPolicy {
            max_attempts: 4,
            backoff: Backoff::Linear,
            delay_seconds: 0.5,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs_f64(0.5));
        assert_eq!(policy.delay_for(2), Duration::from_secs_f64(1.0));
        assert_eq!(policy.delay_for(3), Duration::from_secs_f64(1.5));
    }

    #[test]
    fn test_rc001_retry_delay_negative_base_clamped() {
        let policy = RetryPolicy {
            max_attempts: 2,
            backoff: Backoff::Linear,
            delay_seconds: -1.0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(0));
    }

    #[test]
    fn test_rc001_session_status_display() {
        assert_eq!(SessionStatus::Running.to_string(), "RUNNING");
        assert_eq!(SessionStatus::Completed.to_string(), "COMPLETED");
        assert_eq!(SessionStatus::Failed.to_string(), "FAILED");
    }

    #[test]
    fn test_rc001_session_roundtrip() {
        let session = Session {
            schema: "1.0".to_string(),
            session_id: "s-20260805093011-ab12cd34".to_string(),
            recipe_name: "greet".to_string(),
            recipe_version: "1.0.0".to_string(),
            project_path: PathBuf::from("/work/demo"),
            started_at: Utc::now(),
            updated_at: Utc::now(),
            generator: "receta 0.4.2".to_string(),
            status: SessionStatus::Running,
            context: IndexMap::from([("who".to_string(), "world".to_string())]),
            completed_steps: vec!["hello".to_string()],
        };
        let yaml = serde_yaml_ng::to_string(&session).unwrap();
        let loaded: Session = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(loaded.session_id, session.session_id);
        assert_eq!(loaded.status, SessionStatus::Running);
        assert_eq!(loaded.context["who"], "world");
        assert!(loaded.is_completed("hello"));
        assert!(!loaded.is_completed("goodbye"));
    }

    #[test]
    fn test_rc001_validation_result() {
        let mut result = ValidationResult::default();
        assert!(result.is_valid());
        result.warnings.push("external variable 'who'".to_string());
        assert!(result.is_valid());
        result
            .errors
            .push("recipe must have at least one step".to_string());
        assert!(!result.is_valid());
    }

    #[test]
    fn test_rc001_run_event_serde() {
        let event = RunEvent::StepCompleted {
            session: "s-abc".to_string(),
            step: "scan".to_string(),
            duration_seconds: 1.25,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"step_completed\""));
        assert!(json.contains("\"step\":\"scan\""));
    }

    #[test]
    fn test_rc001_yaml_value_to_string() {
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::String("hello".into())),
            "hello"
        );
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::Bool(true)),
            "true"
        );
        assert_eq!(yaml_value_to_string(&serde_yaml_ng::Value::Null), "");
        assert_eq!(
            yaml_value_to_string(&serde_yaml_ng::Value::Number(serde_yaml_ng::Number::from(7))),
            "7"
        );
    }

    #[test]
    fn test_rc001_recipe_step_lookup() {
        let yaml = r#"
name: two
version: "0.1.0"
steps:
  - id: first
    agent: a/x
    prompt: "one"
  - id: second
    agent: a/y
    prompt: "two"
"#;
        let recipe: Recipe = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(recipe.step("second").unwrap().agent, "a/y");
        assert!(recipe.step("third").is_none());
    }
}
