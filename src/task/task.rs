use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unit of work described in free text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Short unique id
    pub id: String,
    /// What to do
    pub description: String,
    /// Why the holding agent was chosen
    pub rationale: Option<String>,
    /// Reasoning service output, set once execution completes
    pub execution_result: Option<String>,
    /// Assignment time
    pub assigned_at: Option<DateTime<Utc>>,
    /// Completion time
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn new(description: impl Into<String>) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("task-{}", &uuid[..8]),
            description: description.into(),
            rationale: None,
            execution_result: None,
            assigned_at: None,
            completed_at: None,
        }
    }

    pub fn with_rationale(mut self, rationale: impl Into<String>) -> Self {
        self.rationale = Some(rationale.into());
        self
    }

    /// Stamp the assignment time
    pub(crate) fn mark_assigned(&mut self) {
        self.assigned_at = Some(Utc::now());
    }

    /// Store the execution result and stamp completion
    pub(crate) fn complete(&mut self, result: impl Into<String>) {
        self.execution_result = Some(result.into());
        self.completed_at = Some(Utc::now());
    }

    #[allow(dead_code)]
    pub fn is_completed(&self) -> bool {
        self.execution_result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_creation() {
        let task = Task::new("Set up the database");
        assert!(task.id.starts_with("task-"));
        assert_eq!(task.id.len(), "task-".len() + 8);
        assert_eq!(task.description, "Set up the database");
        assert!(task.rationale.is_none());
        assert!(!task.is_completed());
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::new("a");
        let b = Task::new("a");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_complete_sets_result_and_timestamp() {
        let mut task = Task::new("Design the user experience").with_rationale("has design");
        task.mark_assigned();
        assert!(task.assigned_at.is_some());
        assert!(task.completed_at.is_none());

        task.complete("wireframes first");
        assert!(task.is_completed());
        assert_eq!(task.execution_result.as_deref(), Some("wireframes first"));
        assert!(task.completed_at.is_some());
        assert_eq!(task.rationale.as_deref(), Some("has design"));
    }
}
