//! Prompt assembly for roles and tasks

use crate::models::{Role, RunContext, RunInputs, Task};

const FORMAT_INSTRUCTIONS: &str = r#"Use the following format:

Thought: you should always think about what to do
Action: the action to take, only one name of [{tool_names}], just the name, exactly as it's written
Action Input: the input to the action, just a simple JSON object or plain text
Observation: the result of the action

Once all necessary information is gathered:

Thought: I now know the final answer
Final Answer: the final answer to the original input question"#;

const NO_TOOLS_INSTRUCTIONS: &str = r#"Use the following format:

Thought: I now can give a great answer
Final Answer: your complete answer"#;

/// Reminder fed back after a response that could not be parsed
pub const FORMAT_REMINDER: &str = "Your response did not follow the required format. Either call \
exactly one tool with both `Action:` and `Action Input:` lines, or give your answer after \
`Final Answer:`. Never do both in one response.";

/// Persona, goal, tool vocabulary and response format for a role
pub fn system_prompt(role: &Role, inputs: &RunInputs) -> String {
    let mut prompt = format!(
        "You are {}. {}\nYour personal goal is: {}",
        role.name,
        role.backstory,
        inputs.render(&role.goal_template)
    );

    if role.tools.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(NO_TOOLS_INSTRUCTIONS);
    } else {
        prompt.push_str("\n\nYou ONLY have access to the following tools, and should NEVER make up tools that are not listed here:\n\n");
        prompt.push_str(&role.tools.describe());
        prompt.push_str("\n\n");
        prompt.push_str(&FORMAT_INSTRUCTIONS.replace("{tool_names}", &role.tools.list().join(", ")));
    }

    prompt
}

/// Task description, expected output and the accumulated run context
pub fn task_prompt(task: &Task, inputs: &RunInputs, context: &RunContext) -> String {
    let mut prompt = format!(
        "Current Task: {}\n\nThis is the expected criteria for your final answer: {}\nyou MUST return the actual complete content as the final answer, not a summary.",
        inputs.render(&task.description_template).trim(),
        task.expected_output
    );

    if let Some(background) = context.as_background() {
        prompt.push_str("\n\nThis is the context you're working with:\n");
        prompt.push_str(&background);
    }

    prompt.push_str("\n\nBegin! This is VERY important to you, use the tools available and give your best Final Answer, your job depends on it!");
    prompt
}

pub fn observation(text: &str) -> String {
    format!("Observation: {}", text)
}

pub fn parse_failure_observation(raw: &str) -> String {
    format!(
        "Observation: I could not parse your last response:\n{}\n\n{}",
        raw.trim(),
        FORMAT_REMINDER
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;
    use crate::models::{RoleLimits, TaskOutput};
    use crate::tools::{SummaryTool, ToolRegistry};
    use chrono::Utc;
    use std::sync::Arc;

    fn role(tools: ToolRegistry) -> Arc<Role> {
        Arc::new(Role {
            name: "Investment Advisor".to_string(),
            goal_template: "Provide insights for the query: {query}".to_string(),
            backstory: "You translate financial data into plain language.".to_string(),
            tools,
            llm: Arc::new(ScriptedClient::default()),
            limits: RoleLimits::default(),
            allow_delegation: false,
        })
    }

    fn inputs() -> RunInputs {
        RunInputs {
            document_path: "data/doc.pdf".to_string(),
            query: "Is the company growing?".to_string(),
        }
    }

    #[test]
    fn test_system_prompt_lists_tools_and_goal() {
        let tools = ToolRegistry::new().with(Arc::new(SummaryTool::investment()));
        let prompt = system_prompt(&role(tools), &inputs());

        assert!(prompt.starts_with("You are Investment Advisor."));
        assert!(prompt.contains("Your personal goal is: Provide insights for the query: Is the company growing?"));
        assert!(prompt.contains("Investment Analyzer: Takes extracted financial document text"));
        assert!(prompt.contains("only one name of [Investment Analyzer]"));
        assert!(prompt.contains("Final Answer:"));
    }

    #[test]
    fn test_task_prompt_appends_context_in_order() {
        let task = Task {
            name: "investment_analysis".to_string(),
            description_template: "The document is at: {file_path}\nUser query: {query}".to_string(),
            expected_output: "3-5 key observations".to_string(),
            role: role(ToolRegistry::new()),
        };

        let mut context = RunContext::new();
        for (name, text) in [("verification", "valid"), ("financial_analysis", "EPS $2.10")] {
            context.push(TaskOutput {
                task: name.to_string(),
                role: "r".to_string(),
                output: text.to_string(),
                iterations: 1,
                forced_finish: false,
                completed_at: Utc::now(),
            });
        }

        let prompt = task_prompt(&task, &inputs(), &context);
        assert!(prompt.contains("The document is at: data/doc.pdf"));
        assert!(prompt.contains("User query: Is the company growing?"));
        assert!(prompt.contains("3-5 key observations"));
        let first = prompt.find("valid").unwrap();
        let second = prompt.find("EPS $2.10").unwrap();
        assert!(prompt.find("This is the context you're working with").unwrap() < first);
        assert!(first < second);
    }

    #[test]
    fn test_first_task_has_no_context_section() {
        let task = Task {
            name: "verification".to_string(),
            description_template: "Read {file_path}".to_string(),
            expected_output: "A verdict".to_string(),
            role: role(ToolRegistry::new()),
        };

        let prompt = task_prompt(&task, &inputs(), &RunContext::new());
        assert!(!prompt.contains("context you're working with"));
    }
}
