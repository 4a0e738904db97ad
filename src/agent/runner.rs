use std::fmt;
use std::time::Duration;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::{Agent, AgentState};

/// How one agent's execution ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RunStatus {
    Completed { result: String },
    Failed { reason: String },
    /// Deadline hit before the reasoning service answered
    Cancelled,
}

/// Per-agent entry in the execution report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRun {
    pub agent: String,
    pub task: String,
    #[serde(flatten)]
    pub status: RunStatus,
}

/// Combined outcome of one coordinator round, in pool order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub runs: Vec<AgentRun>,
}

impl ExecutionReport {
    pub fn completed(&self) -> impl Iterator<Item = &AgentRun> {
        self.runs
            .iter()
            .filter(|r| matches!(r.status, RunStatus::Completed { .. }))
    }

    /// Failed and cancelled runs
    pub fn failures(&self) -> impl Iterator<Item = &AgentRun> {
        self.runs
            .iter()
            .filter(|r| !matches!(r.status, RunStatus::Completed { .. }))
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    #[allow(dead_code)]
    pub fn get(&self, agent: &str) -> Option<&AgentRun> {
        self.runs.iter().find(|r| r.agent == agent)
    }
}

impl fmt::Display for ExecutionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        writeln!(
            f,
            "{} started, {} completed, {} failed",
            self.runs.len(),
            self.runs.len() - failed,
            failed
        )?;
        for run in &self.runs {
            match &run.status {
                RunStatus::Completed { .. } => writeln!(f, "  ok      {}: {}", run.agent, run.task)?,
                RunStatus::Failed { reason } => {
                    writeln!(f, "  failed  {}: {} ({})", run.agent, run.task, reason)?
                }
                RunStatus::Cancelled => writeln!(f, "  timeout {}: {}", run.agent, run.task)?,
            }
        }
        Ok(())
    }
}

/// Runs every assigned agent concurrently and waits for all of them
#[derive(Debug, Clone, Default)]
pub struct ExecutionCoordinator {
    /// Per-round deadline; unfinished executions are cancelled
    deadline: Option<Duration>,
}

impl ExecutionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Number of agents the next round would start
    pub fn ready_count(agents: &[Agent]) -> usize {
        agents
            .iter()
            .filter(|a| a.state() == AgentState::Assigned)
            .count()
    }

    /// Execute all `assigned` agents; other agents are left alone and not reported.
    pub async fn run(&self, agents: &mut [Agent]) -> ExecutionReport {
        let deadline = self.deadline;
        let started = Self::ready_count(agents);
        tracing::info!(started, "starting execution round");

        let executions = agents
            .iter_mut()
            .filter(|a| a.state() == AgentState::Assigned)
            .map(|agent| async move {
                let task = agent
                    .task()
                    .map(|t| t.description.clone())
                    .unwrap_or_default();

                let outcome = match deadline {
                    Some(limit) => tokio::time::timeout(limit, agent.execute()).await,
                    None => Ok(agent.execute().await),
                };

                let status = match outcome {
                    Ok(Ok(())) => RunStatus::Completed {
                        result: agent
                            .completed_task()
                            .and_then(|t| t.execution_result.clone())
                            .unwrap_or_default(),
                    },
                    Ok(Err(e)) => {
                        tracing::warn!(agent = %agent.name(), error = %e, "execution failed");
                        RunStatus::Failed {
                            reason: e.to_string(),
                        }
                    }
                    Err(_) => {
                        tracing::warn!(agent = %agent.name(), "execution cancelled at deadline");
                        RunStatus::Cancelled
                    }
                };

                AgentRun {
                    agent: agent.name().to_string(),
                    task,
                    status,
                }
            });

        let report = ExecutionReport {
            runs: join_all(executions).await,
        };
        tracing::info!(
            started,
            failed = report.failures().count(),
            "execution round finished"
        );
        report
    }
}
