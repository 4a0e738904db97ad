use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use super::Agent;
use crate::reasoner::{Reasoner, ReasonerSpec};

/// How a candidate identifier from the reasoning service is matched to an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Trimmed, case-insensitive equality with the agent name
    #[default]
    Exact,
    /// Candidate appears anywhere inside the agent name
    Substring,
}

impl MatchPolicy {
    pub fn matches(&self, candidate: &str, agent_name: &str) -> bool {
        let candidate = candidate.trim();
        if candidate.is_empty() {
            return false;
        }
        match self {
            Self::Exact => candidate.eq_ignore_ascii_case(agent_name.trim()),
            Self::Substring => agent_name.contains(candidate),
        }
    }
}

/// One pool member as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl AgentSpec {
    pub fn new(name: &str, skills: &[&str]) -> Self {
        Self {
            name: name.into(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Pool configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Agents, in allocation order
    #[serde(default = "default_agents")]
    pub agents: Vec<AgentSpec>,
    #[serde(default)]
    pub match_policy: MatchPolicy,
    #[serde(default)]
    pub reasoner: ReasonerSpec,
}

fn default_agents() -> Vec<AgentSpec> {
    vec![
        AgentSpec::new("Agent 1", &["frontend", "backend"]),
        AgentSpec::new("Agent 2", &["backend"]),
        AgentSpec::new("Agent 3", &["frontend", "design"]),
    ]
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            agents: default_agents(),
            match_policy: MatchPolicy::default(),
            reasoner: ReasonerSpec::default(),
        }
    }
}

impl PoolConfig {
    /// Default config location
    pub fn default_path() -> PathBuf {
        PathBuf::from(".allot").join("config.json")
    }

    /// Load from a config file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .context(format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject pools the allocator cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.agents.is_empty() {
            bail!("At least one agent must be configured");
        }

        let mut seen = HashSet::new();
        for spec in &self.agents {
            let name = spec.name.trim();
            if name.is_empty() {
                bail!("Agent names must not be empty");
            }
            if !seen.insert(name.to_lowercase()) {
                bail!("Duplicate agent name: {}", name);
            }
        }
        Ok(())
    }

    /// Get agent configuration
    #[allow(dead_code)]
    pub fn get_agent(&self, name: &str) -> Option<&AgentSpec> {
        self.agents.iter().find(|a| a.name == name)
    }

    /// Instantiate the pool, every agent sharing one reasoner
    pub fn build_agents(&self, reasoner: Arc<dyn Reasoner>) -> Vec<Agent> {
        self.agents
            .iter()
            .map(|spec| Agent::new(spec.name.clone(), spec.skills.clone(), Arc::clone(&reasoner)))
            .collect()
    }
}
