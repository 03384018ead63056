//! Agent reasoning loop
//!
//! THINK → (ACT TOOL → OBSERVE → THINK)* → FINISH | FAIL
//!
//! One loop runs one task for one role. Its iteration counter, rate limiter
//! and conversation history are owned by the loop and dropped with it.

use crate::error::AnalysisError;
use crate::models::{AgentAction, ChatTurn, Role, RunInputs};
use crate::Result;
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub mod parser;
pub mod prompt;
pub mod rate_limiter;

pub use parser::{parse_response, strip_invented_observation};
pub use rate_limiter::RateLimiter;

const FORCED_FINISH_FALLBACK: &str =
    "Agent stopped after reaching its iteration limit without producing an answer.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopStatus {
    Thinking,
    ActingTool,
    Finished,
    Failed,
}

impl fmt::Display for LoopStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LoopStatus::Thinking => "thinking",
            LoopStatus::ActingTool => "acting_tool",
            LoopStatus::Finished => "finished",
            LoopStatus::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// Result of a loop that reached `Finished`
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub text: String,
    pub iterations: u32,
    pub parse_failures: u32,
    pub llm_calls: u32,
    /// Finished by hitting the iteration cap rather than a final answer
    pub forced_finish: bool,
}

/// Result of a loop that reached `Failed`
#[derive(Debug)]
pub struct LoopFailure {
    pub cause: AnalysisError,
    pub iterations: u32,
    pub parse_failures: u32,
    pub llm_calls: u32,
    pub last_response: Option<String>,
}

/// Transient per-task state
struct LoopState {
    status: LoopStatus,
    iterations: u32,
    parse_failures: u32,
    llm_calls: u32,
    history: Vec<ChatTurn>,
    last_response: Option<String>,
    last_observation: Option<String>,
    limiter: RateLimiter,
}

pub struct ReasoningLoop<'a> {
    role: &'a Role,
    task_name: &'a str,
    system_prompt: String,
    state: LoopState,
}

impl<'a> ReasoningLoop<'a> {
    pub fn new(role: &'a Role, task_name: &'a str, inputs: &RunInputs, task_prompt: String) -> Self {
        Self {
            role,
            task_name,
            system_prompt: prompt::system_prompt(role, inputs),
            state: LoopState {
                status: LoopStatus::Thinking,
                iterations: 0,
                parse_failures: 0,
                llm_calls: 0,
                history: vec![ChatTurn::user(task_prompt)],
                last_response: None,
                last_observation: None,
                limiter: RateLimiter::per_minute(role.limits.max_calls_per_minute),
            },
        }
    }

    /// Drive the loop to a terminal state. Consumes the loop so its state
    /// cannot outlive the task.
    pub async fn run(mut self, cancel: &CancellationToken) -> std::result::Result<LoopOutcome, LoopFailure> {
        let limits = self.role.limits;

        info!(
            task = self.task_name,
            role = %self.role.name,
            max_iterations = limits.max_iterations,
            max_rpm = limits.max_calls_per_minute,
            delegation = self.role.allow_delegation,
            "Reasoning loop started"
        );

        loop {
            if self.state.iterations >= limits.max_iterations {
                return Ok(self.force_finish());
            }

            let response = match self.think(cancel).await {
                Ok(response) => response,
                Err(cause) => return Err(self.fail(cause)),
            };

            match parse_response(&response) {
                AgentAction::FinalAnswer { text } => {
                    self.state.iterations += 1;
                    self.state.status = LoopStatus::Finished;
                    info!(
                        task = self.task_name,
                        role = %self.role.name,
                        iterations = self.state.iterations,
                        llm_calls = self.state.llm_calls,
                        "Final answer produced"
                    );
                    return Ok(self.outcome(text, false));
                }
                AgentAction::ToolInvocation { name, input } => {
                    self.state.iterations += 1;
                    self.state.status = LoopStatus::ActingTool;
                    let turn = strip_invented_observation(response.trim()).to_string();
                    self.state.history.push(ChatTurn::assistant(turn));

                    let observation = tokio::select! {
                        output = self.role.tools.invoke(&name, &input) => Some(output),
                        _ = cancel.cancelled() => None,
                    };
                    let Some(observation) = observation else {
                        return Err(self.fail(AnalysisError::Cancelled));
                    };

                    if observation.starts_with("Error:") {
                        warn!(
                            task = self.task_name,
                            tool = %name,
                            iteration = self.state.iterations,
                            "Tool returned an error observation: {}",
                            observation
                        );
                    } else {
                        debug!(
                            task = self.task_name,
                            tool = %name,
                            iteration = self.state.iterations,
                            chars = observation.len(),
                            "Tool observation received"
                        );
                    }

                    self.state
                        .history
                        .push(ChatTurn::user(prompt::observation(&observation)));
                    self.state.last_observation = Some(observation);
                    self.state.status = LoopStatus::Thinking;
                }
                AgentAction::Unparseable { raw } => {
                    self.state.parse_failures += 1;
                    warn!(
                        task = self.task_name,
                        role = %self.role.name,
                        parse_failures = self.state.parse_failures,
                        "Unparseable LLM response"
                    );

                    if self.state.parse_failures > limits.max_parse_failures {
                        let cause = AnalysisError::ParseError(format!(
                            "{} responses could not be parsed",
                            self.state.parse_failures
                        ));
                        return Err(self.fail(cause));
                    }

                    self.state
                        .history
                        .push(ChatTurn::user(prompt::parse_failure_observation(&raw)));
                }
            }
        }
    }

    /// One LLM call: wait for a slot, then complete. Provider rate-limit
    /// signals and transient failures make the loop wait and retry the same
    /// call; every retry still takes a limiter slot.
    async fn think(&mut self, cancel: &CancellationToken) -> Result<String> {
        let retry = self.role.llm.retry_policy();
        let mut transient_failures = 0;

        loop {
            let waited = self.state.limiter.acquire(cancel).await?;
            if !waited.is_zero() {
                debug!(
                    task = self.task_name,
                    wait_ms = waited.as_millis() as u64,
                    "Rate-limit slot acquired"
                );
            }

            self.state.llm_calls += 1;
            let completion = tokio::select! {
                result = self.role.llm.complete(&self.system_prompt, &self.state.history) => result,
                _ = cancel.cancelled() => return Err(AnalysisError::Cancelled),
            };

            match completion {
                Ok(response) => {
                    self.state.last_response = Some(response.clone());
                    return Ok(response);
                }
                Err(AnalysisError::RateLimitExceeded { retry_after }) => {
                    let wait = retry_after.unwrap_or_else(|| self.state.limiter.window());
                    warn!(
                        task = self.task_name,
                        wait_ms = wait.as_millis() as u64,
                        "Provider rate limit hit, waiting for next slot"
                    );
                    self.state
                        .limiter
                        .hold_until(tokio::time::Instant::now() + wait);
                }
                Err(e) if e.is_transient() => {
                    transient_failures += 1;
                    let backoff = retry.after_failure(transient_failures, e)?;
                    warn!(
                        task = self.task_name,
                        attempt = transient_failures,
                        wait_ms = backoff.as_millis() as u64,
                        "Transient provider failure, retrying"
                    );
                    self.state
                        .limiter
                        .hold_until(tokio::time::Instant::now() + backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn force_finish(&mut self) -> LoopOutcome {
        self.state.status = LoopStatus::Finished;

        let text = self
            .state
            .last_observation
            .clone()
            .or_else(|| self.state.last_response.clone())
            .unwrap_or_else(|| FORCED_FINISH_FALLBACK.to_string());

        warn!(
            task = self.task_name,
            role = %self.role.name,
            iterations = self.state.iterations,
            "Iteration cap reached, finishing with best available text"
        );

        self.outcome(text, true)
    }

    fn outcome(&self, text: String, forced_finish: bool) -> LoopOutcome {
        LoopOutcome {
            text,
            iterations: self.state.iterations,
            parse_failures: self.state.parse_failures,
            llm_calls: self.state.llm_calls,
            forced_finish,
        }
    }

    fn fail(&mut self, cause: AnalysisError) -> LoopFailure {
        self.state.status = LoopStatus::Failed;

        warn!(
            task = self.task_name,
            role = %self.role.name,
            status = %self.state.status,
            error = %cause,
            "Reasoning loop failed"
        );

        LoopFailure {
            cause,
            iterations: self.state.iterations,
            parse_failures: self.state.parse_failures,
            llm_calls: self.state.llm_calls,
            last_response: self.state.last_response.take(),
        }
    }
}
