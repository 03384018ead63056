//! LLM response parser
//!
//! Turns free text in the `Thought / Action / Action Input / Final Answer`
//! format into an [`AgentAction`]. Knows nothing about which tools exist.

use crate::models::AgentAction;
use regex::Regex;
use std::sync::LazyLock;

static FINAL_ANSWER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)final[\s*]*answer[\s*]*:[\s*]*(.*)").expect("final answer pattern is valid")
});

static ACTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*]*action[ \t*]*:[ \t*]*(.*?)[ \t]*$").expect("action pattern is valid")
});

static ACTION_INPUT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)action[\s*]*input[\s*]*:[\s*]*(.*)").expect("action input pattern is valid")
});

static OBSERVATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[ \t*]*observation[ \t*]*:").expect("observation pattern is valid")
});

/// Classify one LLM response
pub fn parse_response(response: &str) -> AgentAction {
    let raw = response.trim();
    if raw.is_empty() {
        return unparseable(response);
    }

    let raw = strip_invented_observation(raw);

    let action = ACTION_RE.captures(raw).map(|c| clean_tool_name(&c[1]));
    let final_answer = FINAL_ANSWER_RE.captures(raw).map(|c| c[1].trim().to_string());

    match (action, final_answer) {
        // Acting and answering in one breath is ambiguous
        (Some(_), Some(_)) => unparseable(response),
        (Some(name), None) => {
            let input = ACTION_INPUT_RE
                .captures(raw)
                .map(|c| clean_tool_input(&c[1]));

            match input {
                Some(input) if !name.is_empty() => AgentAction::ToolInvocation { name, input },
                _ => unparseable(response),
            }
        }
        (None, Some(text)) if text.is_empty() => unparseable(response),
        (None, Some(text)) => AgentAction::FinalAnswer { text },
        // No tool requested: the whole response is the answer
        (None, None) => AgentAction::FinalAnswer {
            text: raw.to_string(),
        },
    }
}

/// A model that ignores the stop sequence writes its own `Observation:` and
/// keeps going. Everything from that line on is invented and is dropped.
pub fn strip_invented_observation(raw: &str) -> &str {
    let Some(action) = ACTION_RE.find(raw) else {
        return raw;
    };
    match OBSERVATION_RE.find_at(raw, action.end()) {
        Some(m) => raw[..m.start()].trim_end(),
        None => raw,
    }
}

fn unparseable(response: &str) -> AgentAction {
    AgentAction::Unparseable {
        raw: response.to_string(),
    }
}

fn clean_tool_name(name: &str) -> String {
    name.trim()
        .trim_matches(|c: char| matches!(c, '[' | ']' | '"' | '\'' | '`' | '*'))
        .trim()
        .to_string()
}

/// Drop any hallucinated observation and code fences around the input
fn clean_tool_input(input: &str) -> String {
    let input = match OBSERVATION_RE.find(input) {
        Some(m) => &input[..m.start()],
        None => input,
    };

    let input = input.trim();
    let input = input
        .strip_prefix("```json")
        .or_else(|| input.strip_prefix("```"))
        .unwrap_or(input);
    let input = input.strip_suffix("```").unwrap_or(input);

    input.trim().to_string()
}
