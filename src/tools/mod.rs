//! Tool trait and registry
//!
//! Tools are text-in/text-out and fail soft: problems come back as an
//! `Error: ...` string the reasoning loop can observe, never as `Err`.
//! Every tool bounds its output length.

use std::sync::Arc;

pub mod document;
pub mod summary;

pub use document::{PageSource, PdfPageSource, ReadDocumentTool};
pub use summary::SummaryTool;

/// Trait for a single tool
#[async_trait::async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    async fn invoke(&self, input: &str) -> String;
}

/// Ordered set of tools bound to one role
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Register a tool, replacing any tool with the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        match self.tools.iter().position(|t| t.name() == tool.name()) {
            Some(index) => self.tools[index] = tool,
            None => self.tools.push(tool),
        }
    }

    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    /// Case-insensitive lookup
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        let wanted = name.trim();
        self.tools
            .iter()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .cloned()
    }

    pub fn list(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// One `name: description` line per tool, in registration order
    pub fn describe(&self) -> String {
        self.tools
            .iter()
            .map(|t| format!("{}: {}", t.name(), t.description()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Invoke by name. Unknown names yield an error observation.
    pub async fn invoke(&self, name: &str, input: &str) -> String {
        match self.get(name) {
            Some(tool) => tool.invoke(input).await,
            None => format!(
                "Error: Tool '{}' is not available. Available tools: {}",
                name.trim(),
                self.list().join(", ")
            ),
        }
    }
}

/// First `max_chars` characters of `text`, never splitting a character
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

/// Collapse every whitespace run to a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Pull the named argument out of an `Action Input`.
///
/// Accepts a JSON object (`{"path": "..."}`), `key=value` / `key: value`
/// forms, or the bare value, with surrounding quotes removed.
pub fn extract_argument(input: &str, key: &str) -> String {
    let trimmed = input.trim();

    if trimmed.starts_with('{') {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_str(trimmed) {
            let value = map
                .get(key)
                .or_else(|| map.values().find(|v| v.is_string()))
                .and_then(|v| v.as_str());
            if let Some(value) = value {
                return value.trim().to_string();
            }
        }
    }

    let mut value = trimmed;
    for separator in ['=', ':'] {
        if let Some(rest) = value
            .strip_prefix(key)
            .and_then(|rest| rest.trim_start().strip_prefix(separator))
        {
            value = rest.trim();
            break;
        }
    }

    strip_quotes(value).to_string()
}

fn strip_quotes(value: &str) -> &str {
    let value = value.trim();
    for quote in ['"', '\'', '`'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return value[1..value.len() - 1].trim();
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait::async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "Echo"
        }

        fn description(&self) -> &str {
            "Repeats its input"
        }

        async fn invoke(&self, input: &str) -> String {
            input.to_string()
        }
    }

    #[tokio::test]
    async fn test_registry_lookup_and_unknown_tool() {
        let registry = ToolRegistry::new().with(Arc::new(EchoTool));

        assert_eq!(registry.invoke(" echo ", "hi").await, "hi");

        let missing = registry.invoke("Web Search", "hi").await;
        assert_eq!(
            missing,
            "Error: Tool 'Web Search' is not available. Available tools: Echo"
        );
        assert_eq!(registry.describe(), "Echo: Repeats its input");
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("abcdef", 3), "abc");
        assert_eq!(truncate_chars("ab", 3), "ab");
        assert_eq!(truncate_chars("€€€€", 2), "€€");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_extract_argument_forms() {
        assert_eq!(extract_argument(r#"{"path": "data/a.pdf"}"#, "path"), "data/a.pdf");
        assert_eq!(extract_argument("path='data/a.pdf'", "path"), "data/a.pdf");
        assert_eq!(extract_argument("path: data/a.pdf", "path"), "data/a.pdf");
        assert_eq!(extract_argument("  \"data/a.pdf\" ", "path"), "data/a.pdf");
        assert_eq!(extract_argument("Revenue grew 10%", "financial_data"), "Revenue grew 10%");
        assert_eq!(extract_argument("", "path"), "");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Revenue\n\n  $10M\tup "), "Revenue $10M up");
    }
}
