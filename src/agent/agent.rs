use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::prompt;
use crate::error::{AgentError, Result};
use crate::reasoner::Reasoner;
use crate::task::Task;

/// Agent lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentState {
    #[default]
    Idle,
    Assigned,
    Executing,
    Completed,
}

impl AgentState {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Assigned => "assigned",
            Self::Executing => "executing",
            Self::Completed => "completed",
        }
    }

    /// Whether the agent holds a live task in this state
    #[allow(dead_code)]
    pub fn holds_task(&self) -> bool {
        matches!(self, Self::Assigned | Self::Executing)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Lifecycle transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    Assign,
    StartExecution,
    CompleteTask,
    Reset,
}

impl Transition {
    pub const ALL: [Transition; 4] = [
        Self::Assign,
        Self::StartExecution,
        Self::CompleteTask,
        Self::Reset,
    ];

    /// The only state this transition may fire from
    pub fn source(&self) -> AgentState {
        match self {
            Self::Assign => AgentState::Idle,
            Self::StartExecution => AgentState::Assigned,
            Self::CompleteTask => AgentState::Executing,
            Self::Reset => AgentState::Completed,
        }
    }

    pub fn target(&self) -> AgentState {
        match self {
            Self::Assign => AgentState::Assigned,
            Self::StartExecution => AgentState::Executing,
            Self::CompleteTask => AgentState::Completed,
            Self::Reset => AgentState::Idle,
        }
    }
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Assign => "assign",
            Self::StartExecution => "start execution",
            Self::CompleteTask => "complete task",
            Self::Reset => "reset",
        })
    }
}

/// A worker that holds and executes at most one task at a time.
///
/// The live task exists only while `assigned` or `executing`. Completing a task
/// moves it into the completed record, which `reset` clears.
pub struct Agent {
    name: String,
    skills: BTreeSet<String>,
    state: AgentState,
    task: Option<Task>,
    completed: Option<Task>,
    reasoner: Arc<dyn Reasoner>,
}

impl fmt::Debug for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.name)
            .field("skills", &self.skills)
            .field("state", &self.state)
            .field("task", &self.task)
            .field("completed", &self.completed)
            .finish_non_exhaustive()
    }
}

impl Agent {
    pub fn new<I, S>(name: impl Into<String>, skills: I, reasoner: Arc<dyn Reasoner>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            skills: skills.into_iter().map(Into::into).collect(),
            state: AgentState::Idle,
            task: None,
            completed: None,
            reasoner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn skills(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(String::as_str)
    }

    /// Skills joined for prompts and listings
    pub fn skills_label(&self) -> String {
        self.skills().collect::<Vec<_>>().join(", ")
    }

    pub fn state(&self) -> AgentState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == AgentState::Idle
    }

    /// Live task, present while assigned or executing
    pub fn task(&self) -> Option<&Task> {
        self.task.as_ref()
    }

    /// Finished task with its result, present while completed
    pub fn completed_task(&self) -> Option<&Task> {
        self.completed.as_ref()
    }

    /// Fire a transition if the agent is in its source state
    fn apply(&mut self, transition: Transition) -> Result<()> {
        if self.state != transition.source() {
            return Err(AgentError::InvalidTransition {
                agent: self.name.clone(),
                from: self.state,
                transition,
            });
        }
        tracing::trace!(agent = %self.name, %transition, to = %transition.target(), "transition");
        self.state = transition.target();
        Ok(())
    }

    /// Take a task. Only an idle agent accepts one.
    pub fn assign(&mut self, mut task: Task) -> Result<()> {
        if self.state != AgentState::Idle || self.task.is_some() {
            return Err(AgentError::AgentBusy {
                agent: self.name.clone(),
                state: self.state,
            });
        }
        self.apply(Transition::Assign)?;
        task.mark_assigned();
        self.task = Some(task);
        Ok(())
    }

    /// Run the held task through the reasoning service.
    ///
    /// Without a task this does nothing. On failure, or if the future is dropped
    /// mid-call, the agent returns to `assigned` with its task intact.
    pub async fn execute(&mut self) -> Result<()> {
        let Some(description) = self.task.as_ref().map(|t| t.description.clone()) else {
            tracing::debug!(agent = %self.name, state = %self.state, "nothing to execute");
            return Ok(());
        };
        let prompt = prompt::execution_prompt(&self.name, &self.skills_label(), &description);

        self.apply(Transition::StartExecution)?;
        tracing::info!(agent = %self.name, task = %description, "executing task");

        let reasoner = Arc::clone(&self.reasoner);
        let flight = InFlight::new(self);
        match reasoner.complete(&prompt).await {
            Ok(text) => flight.finish(text),
            Err(source) => Err(AgentError::ExecutionFailure {
                agent: flight.agent.name.clone(),
                source,
            }),
        }
    }

    /// Drop the completed task and go back to idle
    pub fn reset(&mut self) -> Result<()> {
        self.apply(Transition::Reset)?;
        self.task = None;
        self.completed = None;
        Ok(())
    }
}

/// Marks an execution in progress; rolls back to `assigned` unless finished
struct InFlight<'a> {
    agent: &'a mut Agent,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn new(agent: &'a mut Agent) -> Self {
        Self {
            agent,
            finished: false,
        }
    }

    fn finish(mut self, result: String) -> Result<()> {
        self.agent.apply(Transition::CompleteTask)?;
        let mut task = self.agent.task.take();
        if let Some(task) = task.as_mut() {
            task.complete(result);
            tracing::info!(agent = %self.agent.name, task = %task.description, "completed task");
        }
        self.agent.completed = task;
        self.finished = true;
        Ok(())
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.finished && self.agent.state == AgentState::Executing {
            tracing::warn!(agent = %self.agent.name, "execution did not finish, back to assigned");
            self.agent.state = AgentState::Assigned;
        }
    }
}
