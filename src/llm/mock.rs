//! Scripted LLM client for development & testing
//!
//! Replays queued responses in order and records every call, so the
//! reasoning loop and pipeline can run without a provider.

use super::LlmClient;
use crate::error::AnalysisError;
use crate::models::ChatTurn;
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub prompt: String,
    pub history: Vec<ChatTurn>,
    pub at: Instant,
}

#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedClient {
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let client = Self::default();
        for response in responses {
            client.push_response(response);
        }
        client
    }

    pub fn push_response(&self, response: impl Into<String>) {
        self.lock_responses().push_back(Ok(response.into()));
    }

    pub fn push_error(&self, error: AnalysisError) {
        self.lock_responses().push_back(Err(error));
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }

    pub fn remaining(&self) -> usize {
        self.lock_responses().len()
    }

    fn lock_responses(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<String>>> {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                prompt: prompt.to_string(),
                history: history.to_vec(),
                at: Instant::now(),
            });
        }

        self.lock_responses().pop_front().unwrap_or_else(|| {
            Err(AnalysisError::ProviderError(
                "Scripted client has no responses left".to_string(),
            ))
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
