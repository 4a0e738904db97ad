//! Text-completion backends used to pick agents and to produce execution output.

mod command;
mod openai;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use command::CommandReasoner;
pub use openai::OpenAiReasoner;

/// Reasoning service failures
#[derive(Error, Debug)]
pub enum ReasonerError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("reasoning service returned an empty response")]
    EmptyResponse,

    #[error("environment variable {0} is not set")]
    MissingCredential(String),
}

/// A single `complete(prompt) -> text` capability
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ReasonerError>;
}

/// Backend selection, as written in the config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ReasonerSpec {
    /// CLI model: prompt is appended as the last argument, stdout is the answer
    Command {
        command: String,
        #[serde(default)]
        args: Vec<String>,
    },
    /// OpenAI-compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAi {
        #[serde(default = "openai::default_base_url")]
        base_url: String,
        #[serde(default = "openai::default_model")]
        model: String,
        #[serde(default = "openai::default_max_tokens")]
        max_tokens: u32,
        #[serde(default = "openai::default_api_key_env")]
        api_key_env: Option<String>,
        #[serde(default = "openai::default_timeout_secs")]
        timeout_secs: u64,
    },
}

impl Default for ReasonerSpec {
    fn default() -> Self {
        Self::Command {
            command: "claude".into(),
            args: vec!["-p".into()],
        }
    }
}

impl ReasonerSpec {
    /// Build the backend once; callers share it
    pub fn build(&self) -> Result<Arc<dyn Reasoner>, ReasonerError> {
        match self {
            Self::Command { command, args } => {
                Ok(Arc::new(CommandReasoner::new(command.clone(), args.clone())))
            }
            Self::OpenAi {
                base_url,
                model,
                max_tokens,
                api_key_env,
                timeout_secs,
            } => {
                let api_key = match api_key_env {
                    Some(var) => Some(
                        std::env::var(var)
                            .map_err(|_| ReasonerError::MissingCredential(var.clone()))?,
                    ),
                    None => None,
                };
                let reasoner = OpenAiReasoner::new(
                    base_url,
                    model,
                    *max_tokens,
                    api_key,
                    std::time::Duration::from_secs(*timeout_secs),
                )?;
                Ok(Arc::new(reasoner))
            }
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Command { command, args } if args.is_empty() => command.clone(),
            Self::Command { command, args } => format!("{} {}", command, args.join(" ")),
            Self::OpenAi { base_url, model, .. } => format!("{} @ {}", model, base_url),
        }
    }
}
