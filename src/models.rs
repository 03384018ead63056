//! Core data models for the document analyzer

use crate::llm::LlmClient;
use crate::tools::ToolRegistry;
use chrono::{DateTime, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, LazyLock};
use uuid::Uuid;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(file_path|query)\}").expect("placeholder pattern is valid"));

//
// ================= Conversation =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

//
// ================= Agent Actions =================
//

/// What an LLM response asks the reasoning loop to do next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentAction {
    ToolInvocation { name: String, input: String },
    FinalAnswer { text: String },
    Unparseable { raw: String },
}

//
// ================= Roles & Tasks =================
//

/// Resource bounds applied to one role's reasoning loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleLimits {
    pub max_iterations: u32,
    pub max_calls_per_minute: u32,
    pub max_parse_failures: u32,
}

impl Default for RoleLimits {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            max_calls_per_minute: 1,
            max_parse_failures: 2,
        }
    }
}

/// A configured persona bound to an LLM and a set of tools.
/// Immutable once built.
pub struct Role {
    pub name: String,
    pub goal_template: String,
    pub backstory: String,
    pub tools: ToolRegistry,
    pub llm: Arc<dyn LlmClient>,
    pub limits: RoleLimits,
    pub allow_delegation: bool,
}

impl fmt::Debug for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Role")
            .field("name", &self.name)
            .field("tools", &self.tools.list())
            .field("model", &self.llm.model())
            .field("limits", &self.limits)
            .finish()
    }
}

/// One pipeline stage. Depends implicitly on every task before it.
#[derive(Debug, Clone)]
pub struct Task {
    pub name: String,
    pub description_template: String,
    pub expected_output: String,
    pub role: Arc<Role>,
}

/// Values substituted into goal and description templates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInputs {
    pub document_path: String,
    pub query: String,
}

impl RunInputs {
    /// Replace `{file_path}` and `{query}` placeholders in one pass, so
    /// braces inside the substituted values are left alone
    pub fn render(&self, template: &str) -> String {
        PLACEHOLDER_RE
            .replace_all(template, |caps: &Captures| match &caps[1] {
                "file_path" => self.document_path.clone(),
                _ => self.query.clone(),
            })
            .into_owned()
    }
}

//
// ================= Run Context =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskOutput {
    pub task: String,
    pub role: String,
    pub output: String,
    pub iterations: u32,
    pub forced_finish: bool,
    pub completed_at: DateTime<Utc>,
}

/// Outputs of finished tasks, in execution order. Append-only.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunContext {
    entries: Vec<TaskOutput>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, output: TaskOutput) {
        self.entries.push(output);
    }

    pub fn entries(&self) -> &[TaskOutput] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&TaskOutput> {
        self.entries.last()
    }

    /// Background section appended to a later task's prompt
    pub fn as_background(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }

        let sections: Vec<String> = self
            .entries
            .iter()
            .map(|entry| format!("### {} ({})\n{}", entry.task, entry.role, entry.output))
            .collect();

        Some(sections.join("\n\n----------\n\n"))
    }
}

//
// ================= Final Result =================
//

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub final_output: String,
    pub context: RunContext,
    pub execution_time_ms: u64,
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}
