//! Process-backed agent invoker.
//!
//! Spawns a configured command once per step: the rendered prompt goes to
//! stdin, step metadata travels in `RECETA_*` environment variables, and
//! stdout is the step output. A non-zero exit is an invocation failure.
//!
//! Environment contract:
//! - `RECETA_AGENT` — the step's agent reference
//! - `RECETA_MODE` — the step's mode tag (unset when absent)
//! - `RECETA_AGENT_CONFIG` — step config overrides as JSON (unset when absent)
//! - `RECETA_TIMEOUT_SECONDS` — timeout passthrough (unset when absent)

use super::{AgentInvoker, InvocationRequest, InvokeError};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Invoker that shells out to an agent-runner program.
#[derive(Debug, Clone)]
pub struct CommandInvoker {
    program: String,
    args: Vec<String>,
}

impl CommandInvoker {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    /// Build from a whitespace-separated command line
    /// (`--agent-command "runner --json"`).
    pub fn from_command_line(command_line: &str) -> Option<Self> {
        let mut parts = command_line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts.map(str::to_string).collect()))
    }
}

#[async_trait]
impl AgentInvoker for CommandInvoker {
    async fn invoke(&self, request: &InvocationRequest) -> Result<String, InvokeError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("RECETA_AGENT", &request.agent)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(ref mode) = request.mode {
            cmd.env("RECETA_MODE", mode);
        }
        if let Some(ref config) = request.config {
            let json = serde_json::to_string(config)
                .map_err(|e| InvokeError(format!("agent_config serialize error: {}", e)))?;
            cmd.env("RECETA_AGENT_CONFIG", json);
        }
        if let Some(timeout) = request.timeout_seconds {
            cmd.env("RECETA_TIMEOUT_SECONDS", timeout.to_string());
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| InvokeError(format!("cannot spawn '{}': {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| InvokeError("cannot open agent stdin".to_string()))?;
        stdin
            .write_all(request.prompt.as_bytes())
            .await
            .map_err(|e| InvokeError(format!("cannot write prompt: {}", e)))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| InvokeError(format!("agent process error: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(InvokeError(format!(
                "exit code {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.trim_end_matches('\n').to_string())
    }
}
