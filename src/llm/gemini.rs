//! Gemini API client
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use super::{classify_status, classify_transport, retry_after, LlmClient, RetryPolicy, STOP_SEQUENCE};
use crate::config::LlmSettings;
use crate::error::AnalysisError;
use crate::models::{ChatRole, ChatTurn};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, warn};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl GeminiClient {
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

    async fn generate_once(&self, request: &GeminiRequest) -> Result<String> {
        let url = format!("{}/{}:generateContent", GEMINI_BASE_URL, self.model);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| classify_transport(e, "Gemini"))?;

        let status = response.status();
        if !status.is_success() {
            let wait = retry_after(response.headers());
            let error_text = response.text().await.unwrap_or_default();
            error!(status = %status, "Gemini API error response: {}", error_text);
            return Err(classify_status(status, wait, &error_text, "Gemini"));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AnalysisError::ProviderError(format!("Gemini parse error: {}", e))
        })?;

        candidate_text(gemini_response)
    }
}

/// Joined parts of the first candidate. A blank answer is returned as is
/// so the reasoning loop can treat it as an unusable response.
fn candidate_text(response: GeminiResponse) -> Result<String> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        AnalysisError::ProviderError("No response from Gemini API".to_string())
    })?;

    let finish_reason = candidate.finish_reason.as_deref().unwrap_or("unknown").to_string();
    let answer: String = candidate
        .content
        .parts
        .into_iter()
        .map(|part| part.text)
        .collect::<Vec<_>>()
        .join("");

    if answer.trim().is_empty() {
        warn!(finish_reason = %finish_reason, "Gemini returned an empty response");
    } else {
        info!(finish_reason = %finish_reason, "Gemini response received");
    }

    Ok(answer)
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, prompt: &str, history: &[ChatTurn]) -> Result<String> {
        let request = build_request(prompt, history, self.temperature);

        debug!(model = %self.model, turns = history.len(), "Calling Gemini API");

        self.generate_once(&request).await
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry.clone()
    }
}

fn build_request(prompt: &str, history: &[ChatTurn], temperature: f32) -> GeminiRequest {
    let contents = history
        .iter()
        .map(|turn| Content {
            role: Some(
                match turn.role {
                    ChatRole::Assistant => "model",
                    ChatRole::User | ChatRole::System => "user",
                }
                .to_string(),
            ),
            parts: vec![Part {
                text: turn.content.clone(),
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        generation_config: GenerationConfig {
            temperature,
            top_p: 0.9,
            top_k: 40,
            max_output_tokens: 1024,
            stop_sequences: vec![STOP_SEQUENCE.to_string()],
        },
        system_instruction: SystemInstruction {
            parts: vec![Part {
                text: prompt.to_string(),
            }],
        },
    }
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
    system_instruction: SystemInstruction,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    stop_sequences: Vec<String>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Content,
    finish_reason: Option<String>,
}
