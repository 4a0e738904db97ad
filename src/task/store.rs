use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;

use super::Task;
use crate::agent::{Agent, ExecutionReport};

/// Transcript record for one completed task
#[derive(Debug, Serialize)]
struct Transcript<'a> {
    agent: &'a str,
    skills: Vec<&'a str>,
    #[serde(flatten)]
    task: &'a Task,
}

/// Writes execution transcripts to a directory
pub struct TranscriptStore {
    dir: PathBuf,
}

impl TranscriptStore {
    /// Create the store, making the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .context(format!("Failed to create transcript dir: {}", dir.display()))?;
        Ok(Self { dir })
    }

    #[allow(dead_code)]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Transcript file path for an agent's task
    pub fn transcript_path(&self, agent: &str, task_id: &str) -> PathBuf {
        self.dir.join(format!("{}-{}.json", slug(agent), task_id))
    }

    /// Save the completed task held by an agent, if any
    pub fn save_agent(&self, agent: &Agent) -> Result<Option<PathBuf>> {
        let Some(task) = agent.completed_task() else {
            return Ok(None);
        };

        let transcript = Transcript {
            agent: agent.name(),
            skills: agent.skills().collect(),
            task,
        };
        let path = self.transcript_path(agent.name(), &task.id);
        let content =
            serde_json::to_string_pretty(&transcript).context("Failed to serialize transcript")?;
        fs::write(&path, content)
            .context(format!("Failed to write transcript: {}", path.display()))?;
        Ok(Some(path))
    }

    /// Save the round report
    pub fn save_report(&self, report: &ExecutionReport) -> Result<PathBuf> {
        let path = self.dir.join("report.json");
        let content =
            serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(&path, content)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(path)
    }

    /// Save transcripts for every agent completed in this round, plus the report
    pub fn save_round(&self, agents: &[Agent], report: &ExecutionReport) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        for run in report.completed() {
            if let Some(agent) = agents.iter().find(|a| a.name() == run.agent) {
                if let Some(path) = self.save_agent(agent)? {
                    written.push(path);
                }
            }
        }
        written.push(self.save_report(report)?);
        tracing::info!(dir = %self.dir.display(), files = written.len(), "transcripts written");
        Ok(written)
    }
}

/// File-name-safe form of an agent name
fn slug(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    let out = out.trim_matches('-').to_string();
    if out.is_empty() {
        "agent".into()
    } else {
        out
    }
}
