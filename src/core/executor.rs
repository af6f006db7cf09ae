//! RC-009: Executor — the recipe state machine.
//!
//! Walks steps in document order:
//! skip already-completed (resumption fast-forward) → render prompt from
//! accumulated context → invoke the agent (bounded retry) → apply the
//! step's on_error policy → persist the session.
//!
//! The session record is persisted after every processed step, so the
//! store always reflects exactly the steps that produced output and a
//! caller can resume from the persisted state without re-running
//! completed work.

use super::error::EngineError;
use super::eventlog;
use super::resolver;
use super::store::SessionStore;
use super::types::{OnError, Recipe, RetryPolicy, RunEvent, Session, SessionStatus, Step};
use crate::invoker::{AgentInvoker, InvocationRequest};
use chrono::Utc;
use std::path::Path;
use std::time::Instant;

/// Prefix for context values recording a tolerated step failure.
const ERROR_MARKER_PREFIX: &str = "[error] ";

/// Build the context value recording a step failure.
pub fn error_marker(reason: &str) -> String {
    format!("{}{}", ERROR_MARKER_PREFIX, reason)
}

/// Whether a context value is an error marker rather than agent output.
pub fn is_error_marker(value: &str) -> bool {
    value.starts_with(ERROR_MARKER_PREFIX)
}

/// Outcome of processing a single step.
enum StepOutcome {
    /// Agent produced output.
    Output(String),
    /// Render or invocation failure after exhausting retries.
    Failed(String),
}

/// Drives validated recipes through their sessions. The agent capability
/// and the store are injected; the executor holds no ambient state.
pub struct Executor<'a> {
    invoker: &'a dyn AgentInvoker,
    store: &'a SessionStore,
}

impl<'a> Executor<'a> {
    pub fn new(invoker: &'a dyn AgentInvoker, store: &'a SessionStore) -> Self {
        Self { invoker, store }
    }

    /// Run a session (freshly created or resumed) to a terminal status.
    ///
    /// Per-step failures are routed through the step's `on_error` policy
    /// and surface in the session record, never as an `Err` here; `Err`
    /// means the store itself failed.
    pub async fn run(
        &self,
        recipe: &Recipe,
        mut session: Session,
    ) -> Result<Session, EngineError> {
        let run_start = Instant::now();
        let session_dir = self.store.session_dir(&session);
        let mut steps_failed = 0u32;

        let _ = eventlog::append_event(
            &session_dir,
            RunEvent::RunStarted {
                session: session.session_id.clone(),
                recipe: recipe.name.clone(),
                receta_version: env!("CARGO_PKG_VERSION").to_string(),
            },
        );

        for (index, step) in recipe.steps.iter().enumerate() {
            if session.is_completed(&step.id) {
                continue;
            }

            let outcome = match resolver::render_template(&step.prompt, &session.context) {
                Ok(prompt) => {
                    self.invoke_with_retry(step, &prompt, &session.session_id, &session_dir)
                        .await
                }
                // Nothing transient about an unbound variable — no retry
                Err(e) => StepOutcome::Failed(e.to_string()),
            };

            match outcome {
                StepOutcome::Output(output) => {
                    session.context.insert(step.id.clone(), output);
                    session.completed_steps.push(step.id.clone());
                    self.persist(&mut session)?;
                }
                StepOutcome::Failed(reason) => {
                    steps_failed += 1;
                    let _ = eventlog::append_event(
                        &session_dir,
                        RunEvent::StepFailed {
                            session: session.session_id.clone(),
                            step: step.id.clone(),
                            error: reason.clone(),
                        },
                    );
                    session
                        .context
                        .insert(step.id.clone(), error_marker(&reason));

                    match step.on_error {
                        OnError::Continue => {
                            session.completed_steps.push(step.id.clone());
                            self.persist(&mut session)?;
                        }
                        OnError::SkipRemaining => {
                            session.completed_steps.push(step.id.clone());
                            let skipped: Vec<String> = recipe.steps[index + 1..]
                                .iter()
                                .map(|s| s.id.clone())
                                .collect();
                            let _ = eventlog::append_event(
                                &session_dir,
                                RunEvent::StepsSkipped {
                                    session: session.session_id.clone(),
                                    after: step.id.clone(),
                                    skipped,
                                },
                            );
                            self.persist(&mut session)?;
                            // Partial success — the session still completes
                            break;
                        }
                        // Unknown never reaches a validated run; abort is
                        // the safe fallback
                        OnError::Abort | OnError::Unknown => {
                            session.status = SessionStatus::Failed;
                            self.persist(&mut session)?;
                            break;
                        }
                    }
                }
            }
        }

        if session.status == SessionStatus::Running {
            session.status = SessionStatus::Completed;
            self.persist(&mut session)?;
        }

        let _ = eventlog::append_event(
            &session_dir,
            RunEvent::RunCompleted {
                session: session.session_id.clone(),
                status: session.status.to_string(),
                steps_completed: session.completed_steps.len() as u32,
                steps_failed,
                total_seconds: run_start.elapsed().as_secs_f64(),
            },
        );

        Ok(session)
    }

    /// One step: bounded attempts with backoff between them. The last
    /// error wins when all attempts fail.
    async fn invoke_with_retry(
        &self,
        step: &Step,
        prompt: &str,
        session_id: &str,
        session_dir: &Path,
    ) -> StepOutcome {
        // No retry block means a single attempt
        let policy = step.retry.clone().unwrap_or(RetryPolicy {
            max_attempts: 1,
            ..RetryPolicy::default()
        });
        let max_attempts = policy.max_attempts.max(1);

        let request = InvocationRequest {
            agent: step.agent.clone(),
            prompt: prompt.to_string(),
            mode: step.mode.clone(),
            config: step.agent_config.clone(),
            timeout_seconds: step.timeout_seconds,
        };

        let mut last_error = String::new();
        for attempt in 1..=max_attempts {
            let _ = eventlog::append_event(
                session_dir,
                RunEvent::StepStarted {
                    session: session_id.to_string(),
                    step: step.id.clone(),
                    agent: step.agent.clone(),
                    attempt,
                },
            );

            let attempt_start = Instant::now();
            match self.invoker.invoke(&request).await {
                Ok(output) => {
                    let _ = eventlog::append_event(
                        session_dir,
                        RunEvent::StepCompleted {
                            session: session_id.to_string(),
                            step: step.id.clone(),
                            duration_seconds: attempt_start.elapsed().as_secs_f64(),
                        },
                    );
                    return StepOutcome::Output(output);
                }
                Err(e) => {
                    last_error = EngineError::AgentInvocation {
                        step: step.id.clone(),
                        reason: e.to_string(),
                    }
                    .to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        StepOutcome::Failed(last_error)
    }

    fn persist(&self, session: &mut Session) -> Result<(), EngineError> {
        session.updated_at = Utc::now();
        self.store.save(session)
    }
}
