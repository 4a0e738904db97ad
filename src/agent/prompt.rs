use super::Agent;

/// Ask the reasoning service which agent should take a task
pub fn decision_prompt(agents: &[Agent], task_description: &str) -> String {
    let roster = agents
        .iter()
        .map(|a| format!("- {}: {}", a.name(), a.skills_label()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"The task is described as follows: "{}".
Assign this task to the most suitable agent based on their skills.

Available agents and their skills:
{}

Provide the response in the following format:
Agent ID: [agent_id]
Rationale: [rationale]
"#,
        task_description, roster
    )
}

/// Ask the reasoning service to play the agent carrying out its task
pub fn execution_prompt(name: &str, skills: &str, task_description: &str) -> String {
    format!(
        "{}, imagine you are an AI agent with skills in {}. \
         Please provide a detailed response on how you would execute the following task: {}. \
         Be specific and provide relevant examples or steps.",
        name, skills, task_description
    )
}
