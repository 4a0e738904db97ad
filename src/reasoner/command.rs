use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{Reasoner, ReasonerError};

/// Runs a CLI model once per prompt
#[derive(Debug, Clone)]
pub struct CommandReasoner {
    command: String,
    args: Vec<String>,
}

impl CommandReasoner {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
        }
    }
}

#[async_trait]
impl Reasoner for CommandReasoner {
    async fn complete(&self, prompt: &str) -> Result<String, ReasonerError> {
        tracing::debug!(command = %self.command, "spawning reasoner");

        // The child is killed if the execution future is dropped
        let output = Command::new(&self.command)
            .args(&self.args)
            .arg(prompt)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ReasonerError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ReasonerError::CommandFailed {
                command: self.command.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(ReasonerError::EmptyResponse);
        }
        Ok(stdout)
    }
}
