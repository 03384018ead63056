//! Sequential task pipeline
//!
//! Tasks run strictly in order. Each task sees the finished outputs of every
//! task before it; the first failure aborts the whole run.

use crate::agent::{prompt, ReasoningLoop};
use crate::error::{AnalysisError, PipelineAbort};
use crate::models::{PipelineReport, RunContext, RunInputs, Task, TaskOutput};
use crate::Result;
use chrono::Utc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Maximum tasks allowed per pipeline
const MAX_TASKS_PER_PIPELINE: usize = 16;

pub struct TaskPipeline {
    tasks: Vec<Task>,
}

impl TaskPipeline {
    pub fn new(tasks: Vec<Task>) -> Result<Self> {
        if tasks.is_empty() {
            return Err(AnalysisError::InvalidPipeline(
                "Pipeline needs at least one task".to_string(),
            ));
        }

        if tasks.len() > MAX_TASKS_PER_PIPELINE {
            return Err(AnalysisError::InvalidPipeline(format!(
                "Pipeline exceeds maximum allowed tasks ({})",
                MAX_TASKS_PER_PIPELINE
            )));
        }

        Ok(Self { tasks })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Run every task in order and report the last task's output
    pub async fn run(&self, inputs: &RunInputs, cancel: &CancellationToken) -> Result<PipelineReport> {
        let run_id = Uuid::new_v4();
        let start = Instant::now();
        let mut context = RunContext::new();

        info!(
            run_id = %run_id,
            task_count = self.tasks.len(),
            document = %inputs.document_path,
            "Pipeline started"
        );

        for (index, task) in self.tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                error!(run_id = %run_id, task = %task.name, "Run cancelled before task start");
                return Err(PipelineAbort {
                    task_index: index,
                    task: task.name.clone(),
                    role: task.role.name.clone(),
                    iterations: 0,
                    parse_failures: 0,
                    last_response: None,
                    cause: AnalysisError::Cancelled,
                }
                .into());
            }

            let task_prompt = prompt::task_prompt(task, inputs, &context);
            debug!(
                run_id = %run_id,
                task = %task.name,
                prompt_chars = task_prompt.len(),
                context_entries = context.len(),
                "Task prompt built"
            );

            let outcome = ReasoningLoop::new(&task.role, &task.name, inputs, task_prompt)
                .run(cancel)
                .await;

            match outcome {
                Ok(outcome) => {
                    info!(
                        run_id = %run_id,
                        task = %task.name,
                        iterations = outcome.iterations,
                        llm_calls = outcome.llm_calls,
                        forced_finish = outcome.forced_finish,
                        "Task finished"
                    );

                    context.push(TaskOutput {
                        task: task.name.clone(),
                        role: task.role.name.clone(),
                        output: outcome.text,
                        iterations: outcome.iterations,
                        forced_finish: outcome.forced_finish,
                        completed_at: Utc::now(),
                    });
                }
                Err(failure) => {
                    error!(
                        run_id = %run_id,
                        task = %task.name,
                        error = %failure.cause,
                        "Task failed, aborting pipeline"
                    );

                    return Err(PipelineAbort {
                        task_index: index,
                        task: task.name.clone(),
                        role: task.role.name.clone(),
                        iterations: failure.iterations,
                        parse_failures: failure.parse_failures,
                        last_response: failure.last_response,
                        cause: failure.cause,
                    }
                    .into());
                }
            }
        }

        let final_output = context
            .last()
            .map(|entry| entry.output.clone())
            .unwrap_or_default();

        let execution_time_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, execution_time_ms, "Pipeline completed");

        Ok(PipelineReport {
            run_id,
            final_output,
            context,
            execution_time_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedClient;
    use crate::models::{Role, RoleLimits};
    use crate::tools::ToolRegistry;
    use std::sync::Arc;

    fn task(name: &str, llm: Arc<ScriptedClient>) -> Task {
        Task {
            name: name.to_string(),
            description_template: format!("{} for {{file_path}}", name),
            expected_output: "text".to_string(),
            role: Arc::new(Role {
                name: format!("{} role", name),
                goal_template: "goal".to_string(),
                backstory: "backstory".to_string(),
                tools: ToolRegistry::new(),
                llm,
                limits: RoleLimits {
                    max_iterations: 2,
                    max_calls_per_minute: 30,
                    max_parse_failures: 0,
                },
                allow_delegation: false,
            }),
        }
    }

    fn inputs() -> RunInputs {
        RunInputs {
            document_path: "data/doc.pdf".to_string(),
            query: "q".to_string(),
        }
    }

    #[test]
    fn test_empty_pipeline_is_rejected() {
        assert!(matches!(
            TaskPipeline::new(vec![]),
            Err(AnalysisError::InvalidPipeline(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_accumulates_in_order() {
        let llms: Vec<Arc<ScriptedClient>> = (1..=3)
            .map(|n| Arc::new(ScriptedClient::new([format!("Final Answer: output {}", n)])))
            .collect();
        let pipeline = TaskPipeline::new(vec![
            task("first", llms[0].clone()),
            task("second", llms[1].clone()),
            task("third", llms[2].clone()),
        ])
        .unwrap();

        let report = pipeline.run(&inputs(), &CancellationToken::new()).await.unwrap();

        assert_eq!(report.final_output, "output 3");
        let names: Vec<&str> = report.context.entries().iter().map(|e| e.task.as_str()).collect();
        assert_eq!(names, vec!["first", "second", "third"]);

        // Task N sees outputs 1..N-1 and nothing later
        let third_prompt = &llms[2].calls()[0].history[0].content;
        assert!(third_prompt.contains("output 1"));
        assert!(third_prompt.contains("output 2"));
        assert!(!third_prompt.contains("second for data/doc.pdf"));
        let first_prompt = &llms[0].calls()[0].history[0].content;
        assert!(first_prompt.contains("first for data/doc.pdf"));
        assert!(!first_prompt.contains("output"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_aborts_and_skips_downstream() {
        let first = Arc::new(ScriptedClient::new(["Final Answer: ok"]));
        let second = Arc::new(ScriptedClient::new([""]));
        let third = Arc::new(ScriptedClient::new(["Final Answer: unreachable"]));

        let pipeline = TaskPipeline::new(vec![
            task("first", first.clone()),
            task("second", second.clone()),
            task("third", third.clone()),
        ])
        .unwrap();

        let err = pipeline.run(&inputs(), &CancellationToken::new()).await.unwrap_err();

        match err {
            AnalysisError::PipelineAbort(abort) => {
                assert_eq!(abort.task_index, 1);
                assert_eq!(abort.task, "second");
                assert_eq!(abort.parse_failures, 1);
                assert!(matches!(abort.cause, AnalysisError::ParseError(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(third.call_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_run_executes_nothing() {
        let llm = Arc::new(ScriptedClient::new(["Final Answer: ok"]));
        let pipeline = TaskPipeline::new(vec![task("first", llm.clone())]).unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = pipeline.run(&inputs(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(llm.call_count(), 0);
    }
}
