//! Groq chat-completions client (OpenAI-compatible wire format)

use super::{classify_status, classify_transport, retry_after, LlmClient, RetryPolicy, STOP_SEQUENCE};
use crate::config::LlmSettings;
use crate::error::AnalysisError;
use crate::models::{ChatRole, ChatTurn};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};

const GROQ_CHAT_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
const MAX_COMPLETION_TOKENS: u32 = 1024;

pub struct GroqClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl GroqClient {
    pub fn new(settings: &LlmSettings) -> Result<Self> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(settings.timeout)
            .build()
            .map_err(|e| AnalysisError::ProviderError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            retry: RetryPolicy::with_max_attempts(settings.max_retries),
        })
    }

    async fn send_once(&self, request: &ChatCompletionRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(GROQ_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(e, "Groq"))?;

        let status = response.status();
        if !status.is_success() {
            let wait = retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "Groq API error response: {}", body);
            return Err(classify_status(status, wait, &body, "Groq"));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            AnalysisError::ProviderError(format!("Groq response parse error: {}", e))
        })?;

        if let Some(usage) = &completion.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Groq usage"
            );
        }

        completion_text(completion)
    }
}

/// Text of the first choice. A blank message is returned as is so the
/// reasoning loop can treat it as an unusable response.
fn completion_text(completion: ChatCompletionResponse) -> Result<String> {
    let choice = completion
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AnalysisError::ProviderError("Groq returned no choices".to_string()))?;

    let text = choice.message.content.unwrap_or_default();
    if text.trim().is_empty() {
        warn!("Groq returned an empty completion");
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for GroqClient {
    async fn complete(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        let request = build_request(&self.model, self.temperature, prompt, history);

        debug!(model = %self.model, turns = history.len(), "Calling Groq API");

        self.send_once(&request).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }
}

fn build_request<'a>(
    model: &'a str,
    temperature: f32,
    prompt: &'a str,
    history: &'a [ChatTurn],
) -> ChatCompletionRequest<'a> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(Message {
        role: "system",
        content: prompt,
    });
    messages.extend(history.iter().map(|turn| Message {
        role: match turn.role {
            ChatRole::System => "system",
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        },
        content: &turn.content,
    }));

    ChatCompletionRequest {
        model,
        messages,
        temperature,
        max_tokens: MAX_COMPLETION_TOKENS,
        stop: [STOP_SEQUENCE],
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    stop: [&'static str; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
