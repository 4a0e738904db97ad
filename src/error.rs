use thiserror::Error;

use crate::agent::{AgentState, Transition};
use crate::reasoner::ReasonerError;

/// Errors raised by agent operations
#[derive(Error, Debug)]
pub enum AgentError {
    /// Transition attempted from a state that is not its source
    #[error("{agent}: cannot {transition} while {from}")]
    InvalidTransition {
        agent: String,
        from: AgentState,
        transition: Transition,
    },

    /// Agent already holds a task
    #[error("{agent} is busy ({state})")]
    AgentBusy { agent: String, state: AgentState },

    /// Reasoning service failed while the agent was executing
    #[error("{agent} failed to execute its task: {source}")]
    ExecutionFailure {
        agent: String,
        #[source]
        source: ReasonerError,
    },
}

pub type Result<T> = std::result::Result<T, AgentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_transition_display() {
        let err = AgentError::InvalidTransition {
            agent: "Agent 1".into(),
            from: AgentState::Idle,
            transition: Transition::Reset,
        };
        let msg = err.to_string();
        assert!(msg.contains("Agent 1"));
        assert!(msg.contains("reset"));
        assert!(msg.contains("idle"));
    }

    #[test]
    fn test_execution_failure_keeps_source() {
        let err = AgentError::ExecutionFailure {
            agent: "Agent 2".into(),
            source: ReasonerError::EmptyResponse,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("Agent 2"));
    }
}
