use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::{prompt, Agent, MatchPolicy};
use crate::error::AgentError;
use crate::reasoner::Reasoner;
use crate::task::Task;

const AGENT_ID_LABEL: &str = "Agent ID:";
const RATIONALE_LABEL: &str = "Rationale:";

/// Parsed recommendation from the reasoning service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationDecision {
    /// Raw candidate token, matched against agent names
    pub agent_id: String,
    pub rationale: String,
}

/// Why an allocation was not made
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    AgentBusy { agent: String },
    AgentNotFound { candidate: String },
    MalformedDecision { detail: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AgentBusy { agent } => write!(f, "{} is already assigned a task", agent),
            Self::AgentNotFound { candidate } => write!(f, "no agent matches '{}'", candidate),
            Self::MalformedDecision { detail } => write!(f, "unusable decision: {}", detail),
        }
    }
}

/// Result of one `allocate` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AllocationOutcome {
    Assigned { agent: String },
    Skipped(SkipReason),
}

impl AllocationOutcome {
    #[allow(dead_code)]
    pub fn is_assigned(&self) -> bool {
        matches!(self, Self::Assigned { .. })
    }
}

impl fmt::Display for AllocationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assigned { agent } => write!(f, "assigned to {}", agent),
            Self::Skipped(reason) => write!(f, "skipped: {}", reason),
        }
    }
}

/// Extract the `Agent ID:` and `Rationale:` fields from a response.
///
/// Lines are matched after trimming; everything else is ignored. A repeated
/// label overwrites the earlier value. Empty values count as missing.
pub fn parse_decision(response: &str) -> Result<AllocationDecision, SkipReason> {
    let mut agent_id = None;
    let mut rationale = None;

    for line in response.lines().map(str::trim) {
        if line.starts_with(AGENT_ID_LABEL) {
            agent_id = field_value(line);
        } else if line.starts_with(RATIONALE_LABEL) {
            rationale = field_value(line);
        }
    }

    match (agent_id, rationale) {
        (Some(agent_id), Some(rationale)) => Ok(AllocationDecision {
            agent_id,
            rationale,
        }),
        (None, _) => Err(SkipReason::MalformedDecision {
            detail: "missing Agent ID line".into(),
        }),
        (_, None) => Err(SkipReason::MalformedDecision {
            detail: "missing Rationale line".into(),
        }),
    }
}

/// Remainder after the first colon, trimmed; `None` when empty
fn field_value(line: &str) -> Option<String> {
    line.split_once(':')
        .map(|(_, rest)| rest.trim())
        .filter(|rest| !rest.is_empty())
        .map(str::to_string)
}

/// Index of the first agent, in pool order, matching the candidate
pub fn resolve(agents: &[Agent], candidate: &str, policy: MatchPolicy) -> Option<usize> {
    agents.iter().position(|a| policy.matches(candidate, a.name()))
}

/// Maps task descriptions onto idle agents using the reasoning service
pub struct TaskAllocator {
    reasoner: Arc<dyn Reasoner>,
    agents: Vec<Agent>,
    policy: MatchPolicy,
}

impl TaskAllocator {
    pub fn new(reasoner: Arc<dyn Reasoner>, agents: Vec<Agent>, policy: MatchPolicy) -> Self {
        Self {
            reasoner,
            agents,
            policy,
        }
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    /// Pool access for the execution coordinator
    pub fn agents_mut(&mut self) -> &mut [Agent] {
        &mut self.agents
    }

    pub fn agent(&self, name: &str) -> Option<&Agent> {
        self.agents.iter().find(|a| a.name() == name)
    }

    /// Ask for a recommendation and assign the task if the chosen agent is idle.
    ///
    /// One reasoning call, no retry. Skipped tasks are dropped.
    pub async fn allocate(&mut self, description: &str) -> AllocationOutcome {
        let prompt = prompt::decision_prompt(&self.agents, description);
        tracing::debug!(task = %description, "requesting allocation decision");

        let response = match self.reasoner.complete(&prompt).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(task = %description, error = %e, "reasoning service failed");
                return AllocationOutcome::Skipped(SkipReason::MalformedDecision {
                    detail: format!("no response: {}", e),
                });
            }
        };
        tracing::debug!(response = %response, "allocation response");

        let decision = match parse_decision(&response) {
            Ok(decision) => decision,
            Err(reason) => {
                tracing::warn!(task = %description, %reason, "unable to parse allocation decision");
                return AllocationOutcome::Skipped(reason);
            }
        };

        let Some(index) = resolve(&self.agents, &decision.agent_id, self.policy) else {
            tracing::warn!(candidate = %decision.agent_id, "no agent matches candidate");
            return AllocationOutcome::Skipped(SkipReason::AgentNotFound {
                candidate: decision.agent_id,
            });
        };

        let agent = &mut self.agents[index];
        let task = Task::new(description).with_rationale(decision.rationale);
        match agent.assign(task) {
            Ok(()) => {
                tracing::info!(agent = %agent.name(), task = %description, "task allocated");
                AllocationOutcome::Assigned {
                    agent: agent.name().to_string(),
                }
            }
            Err(AgentError::AgentBusy { agent, state }) => {
                tracing::warn!(%agent, %state, task = %description, "agent busy, skipping task");
                AllocationOutcome::Skipped(SkipReason::AgentBusy { agent })
            }
            Err(e) => {
                // assign only reports AgentBusy; keep the outcome classified anyway
                tracing::error!(error = %e, "unexpected assignment failure");
                AllocationOutcome::Skipped(SkipReason::AgentBusy {
                    agent: agent.name().to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{AgentState, PoolConfig};
    use crate::reasoner::testing::ScriptedReasoner;

    fn allocator(reasoner: ScriptedReasoner, policy: MatchPolicy) -> TaskAllocator {
        let reasoner = reasoner.into_arc();
        let agents = PoolConfig::default().build_agents(Arc::clone(&reasoner));
        TaskAllocator::new(reasoner, agents, policy)
    }

    fn states(allocator: &TaskAllocator) -> Vec<AgentState> {
        allocator.agents().iter().map(|a| a.state()).collect()
    }

    // ========================================
    // parse_decision Tests
    // ========================================

    #[test]
    fn test_parse_basic() {
        let decision = parse_decision("Agent ID: Agent 2\nRationale: best fit\n").unwrap();
        assert_eq!(decision.agent_id, "Agent 2");
        assert_eq!(decision.rationale, "best fit");
    }

    #[test]
    fn test_parse_ignores_other_lines_and_indentation() {
        let response = "Sure, here is my answer.\n\n   Agent ID:   Agent 3  \n\tRationale: design skills\nThanks!";
        let decision = parse_decision(response).unwrap();
        assert_eq!(decision.agent_id, "Agent 3");
        assert_eq!(decision.rationale, "design skills");
    }

    #[test]
    fn test_parse_rationale_keeps_later_colons() {
        let decision =
            parse_decision("Agent ID: Agent 1\nRationale: skills: frontend, backend").unwrap();
        assert_eq!(decision.rationale, "skills: frontend, backend");
    }

    #[test]
    fn test_parse_agent_id_uses_first_colon() {
        let decision = parse_decision("Agent ID: team: Agent 1\nRationale: ok").unwrap();
        assert_eq!(decision.agent_id, "team: Agent 1");
    }

    #[test]
    fn test_parse_duplicate_labels_last_wins() {
        let response = "Agent ID: Agent 1\nRationale: first\nAgent ID: Agent 2\nRationale: second";
        let decision = parse_decision(response).unwrap();
        assert_eq!(decision.agent_id, "Agent 2");
        assert_eq!(decision.rationale, "second");
    }

    #[test]
    fn test_parse_missing_agent_id() {
        let err = parse_decision("Rationale: no agent given").unwrap_err();
        assert!(matches!(err, SkipReason::MalformedDecision { .. }));
    }

    #[test]
    fn test_parse_missing_rationale() {
        let err = parse_decision("Agent ID: Agent 1").unwrap_err();
        assert!(matches!(err, SkipReason::MalformedDecision { detail } if detail.contains("Rationale")));
    }

    #[test]
    fn test_parse_empty_values_are_missing() {
        assert!(parse_decision("Agent ID:\nRationale: something").is_err());
        assert!(parse_decision("Agent ID: Agent 1\nRationale:   ").is_err());
    }

    #[test]
    fn test_parse_label_must_start_the_line() {
        assert!(parse_decision("The Agent ID: Agent 1\nRationale: ok").is_err());
        assert!(parse_decision("agent id: Agent 1\nRationale: ok").is_err());
    }

    // ========================================
    // resolve Tests
    // ========================================

    #[test]
    fn test_resolve_exact_and_substring() {
        let reasoner = ScriptedReasoner::new().into_arc();
        let agents = vec![
            Agent::new("Agent 1", ["a"], Arc::clone(&reasoner)),
            Agent::new("Agent 10", ["b"], Arc::clone(&reasoner)),
        ];

        assert_eq!(resolve(&agents, "Agent 10", MatchPolicy::Exact), Some(1));
        assert_eq!(resolve(&agents, "10", MatchPolicy::Exact), None);
        assert_eq!(resolve(&agents, "10", MatchPolicy::Substring), Some(1));
        // first match in pool order
        assert_eq!(resolve(&agents, "Agent 1", MatchPolicy::Substring), Some(0));
        assert_eq!(resolve(&agents, "Agent", MatchPolicy::Substring), Some(0));
        assert_eq!(resolve(&agents, "Agent 7", MatchPolicy::Substring), None);
    }

    // ========================================
    // TaskAllocator Tests
    // ========================================

    #[tokio::test]
    async fn test_allocate_assigns_with_rationale() {
        let mut allocator = allocator(
            ScriptedReasoner::new().reply("Agent ID: Agent 2\nRationale: best fit\n"),
            MatchPolicy::Exact,
        );

        let outcome = allocator.allocate("Set up the database").await;

        assert_eq!(
            outcome,
            AllocationOutcome::Assigned {
                agent: "Agent 2".into()
            }
        );
        let agent = allocator.agent("Agent 2").unwrap();
        assert_eq!(agent.state(), AgentState::Assigned);
        let task = agent.task().unwrap();
        assert_eq!(task.description, "Set up the database");
        assert_eq!(task.rationale.as_deref(), Some("best fit"));
    }

    #[tokio::test]
    async fn test_allocate_sends_roster_and_task() {
        let reasoner = Arc::new(ScriptedReasoner::new().reply("Agent ID: Agent 1\nRationale: x"));
        let agents = PoolConfig::default().build_agents(reasoner.clone());
        let mut allocator = TaskAllocator::new(reasoner.clone(), agents, MatchPolicy::Exact);

        allocator.allocate("Build the user interface").await;

        let prompts = reasoner.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Build the user interface"));
        assert!(prompts[0].contains("- Agent 2: backend"));
        assert!(prompts[0].contains("- Agent 3: design, frontend"));
    }

    #[tokio::test]
    async fn test_allocate_malformed_changes_nothing() {
        let mut allocator = allocator(
            ScriptedReasoner::new().reply("I would pick the second one.\nRationale: backend"),
            MatchPolicy::Exact,
        );

        let outcome = allocator.allocate("Set up the database").await;

        assert!(matches!(
            outcome,
            AllocationOutcome::Skipped(SkipReason::MalformedDecision { .. })
        ));
        assert!(states(&allocator).iter().all(|s| *s == AgentState::Idle));
    }

    #[tokio::test]
    async fn test_allocate_reasoner_failure_is_malformed() {
        let mut allocator = allocator(ScriptedReasoner::new().fail("rate limited"), MatchPolicy::Exact);

        let outcome = allocator.allocate("Set up the database").await;

        match outcome {
            AllocationOutcome::Skipped(SkipReason::MalformedDecision { detail }) => {
                assert!(detail.contains("rate limited"))
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert!(states(&allocator).iter().all(|s| *s == AgentState::Idle));
    }

    #[tokio::test]
    async fn test_allocate_unknown_agent() {
        let mut allocator = allocator(
            ScriptedReasoner::new().reply("Agent ID: Agent 9\nRationale: nobody"),
            MatchPolicy::Exact,
        );

        let outcome = allocator.allocate("Write docs").await;

        assert_eq!(
            outcome,
            AllocationOutcome::Skipped(SkipReason::AgentNotFound {
                candidate: "Agent 9".into()
            })
        );
        assert!(states(&allocator).iter().all(|s| *s == AgentState::Idle));
    }

    #[tokio::test]
    async fn test_allocate_busy_agent_keeps_first_task() {
        let mut allocator = allocator(
            ScriptedReasoner::new()
                .reply("Agent ID: Agent 1\nRationale: first")
                .reply("Agent ID: Agent 1\nRationale: second"),
            MatchPolicy::Exact,
        );

        let first = allocator.allocate("Build the user interface").await;
        let second = allocator.allocate("Design the user experience").await;

        assert!(first.is_assigned());
        assert_eq!(
            second,
            AllocationOutcome::Skipped(SkipReason::AgentBusy {
                agent: "Agent 1".into()
            })
        );
        let task = allocator.agent("Agent 1").unwrap().task().unwrap();
        assert_eq!(task.description, "Build the user interface");
        assert_eq!(task.rationale.as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn test_allocate_substring_policy_accepts_bare_number() {
        let mut allocator = allocator(
            ScriptedReasoner::new().reply("Agent ID: 3\nRationale: design skills"),
            MatchPolicy::Substring,
        );

        let outcome = allocator.allocate("Design the user experience").await;

        assert_eq!(
            outcome,
            AllocationOutcome::Assigned {
                agent: "Agent 3".into()
            }
        );
    }

    #[tokio::test]
    async fn test_allocate_exact_policy_rejects_bare_number() {
        let mut allocator = allocator(
            ScriptedReasoner::new().reply("Agent ID: 3\nRationale: design skills"),
            MatchPolicy::Exact,
        );

        let outcome = allocator.allocate("Design the user experience").await;

        assert!(matches!(
            outcome,
            AllocationOutcome::Skipped(SkipReason::AgentNotFound { .. })
        ));
    }

    #[test]
    fn test_outcome_display_and_serialization() {
        let outcome = AllocationOutcome::Skipped(SkipReason::AgentBusy {
            agent: "Agent 1".into(),
        });
        assert_eq!(outcome.to_string(), "skipped: Agent 1 is already assigned a task");

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "skipped");
        assert_eq!(json["reason"], "agent_busy");
        assert_eq!(json["agent"], "Agent 1");
    }
}
