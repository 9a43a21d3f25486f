//! Completion service client.
//!
//! [`CompletionService`] is the text-in/text-out boundary: one prompt, one
//! model identifier, one answer. [`OpenAiCompatibleClient`] speaks either the
//! Chat Completions or the Responses shape of an OpenAI-compatible HTTP API
//! (Groq by default).
//!
//! # Response extraction
//!
//! | API | Answer field |
//! |-----|--------------|
//! | `chat` | `choices[0].message.content` |
//! | `responses` | `output_text`, else every `output[].content[]` item of type `output_text`, concatenated |
//!
//! A missing or `null` field is an empty answer, not an error.
//!
//! # Failures
//!
//! Requests are sent once. Failures map onto [`GenerationError`] so callers
//! can use [`GenerationError::is_transient`] to choose between retrying and
//! reporting a configuration problem.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{CompletionApi, CompletionConfig};
use crate::error::GenerationError;
use crate::models::CompletionResult;

/// Longest service error body kept in a [`GenerationError`].
const MAX_ERROR_BODY_CHARS: usize = 500;

#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Submit a single-turn completion and return the extracted answer text.
    async fn complete(&self, prompt: &str, model: &str)
        -> Result<CompletionResult, GenerationError>;
}

pub struct OpenAiCompatibleClient {
    http: reqwest::Client,
    base_url: String,
    api: CompletionApi,
    api_key_env: String,
    timeout_secs: u64,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &CompletionConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api: config.api,
            api_key_env: config.api_key_env.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn endpoint(&self) -> String {
        match self.api {
            CompletionApi::Chat => format!("{}/chat/completions", self.base_url),
            CompletionApi::Responses => format!("{}/responses", self.base_url),
        }
    }

    fn request_body(&self, prompt: &str, model: &str) -> Value {
        match self.api {
            CompletionApi::Chat => json!({
                "model": model,
                "messages": [{ "role": "user", "content": prompt }],
            }),
            CompletionApi::Responses => json!({
                "model": model,
                "input": prompt,
            }),
        }
    }

    fn transport_error(&self, err: reqwest::Error) -> GenerationError {
        if err.is_timeout() {
            GenerationError::Timeout(self.timeout_secs)
        } else {
            GenerationError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl CompletionService for OpenAiCompatibleClient {
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<CompletionResult, GenerationError> {
        let api_key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| GenerationError::MissingCredential(self.api_key_env.clone()))?;

        let url = self.endpoint();
        tracing::debug!(%url, model, prompt_chars = prompt.chars().count(), "sending completion request");

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(prompt, model))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            return Err(classify_status(status.as_u16(), model, &body));
        }

        let json: Value = serde_json::from_str(&body)
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        let answer = match self.api {
            CompletionApi::Chat => chat_answer(&json),
            CompletionApi::Responses => responses_answer(&json),
        };
        Ok(CompletionResult { answer })
    }
}

/// Map a non-success HTTP status (and its body) to a [`GenerationError`].
pub fn classify_status(status: u16, model: &str, body: &str) -> GenerationError {
    let body = truncate_body(body);
    match status {
        401 | 403 => GenerationError::Unauthorized { status, body },
        404 => GenerationError::InvalidModel {
            model: model.to_string(),
            status,
            body,
        },
        400 if mentions_unknown_model(&body) => GenerationError::InvalidModel {
            model: model.to_string(),
            status,
            body,
        },
        429 => GenerationError::RateLimited(body),
        _ => GenerationError::Service { status, body },
    }
}

fn mentions_unknown_model(body: &str) -> bool {
    let lower = body.to_lowercase();
    if lower.contains("model_not_found") {
        return true;
    }
    lower.contains("model")
        && (lower.contains("not found")
            || lower.contains("does not exist")
            || lower.contains("decommissioned"))
}

fn truncate_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_ERROR_BODY_CHARS {
        trimmed.to_string()
    } else {
        let mut s: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        s.push_str("...");
        s
    }
}

fn chat_answer(json: &Value) -> String {
    json.pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn responses_answer(json: &Value) -> String {
    if let Some(text) = json.get("output_text").and_then(Value::as_str) {
        return text.to_string();
    }

    let Some(output) = json.get("output").and_then(Value::as_array) else {
        return String::new();
    };
    output
        .iter()
        .filter_map(|item| item.get("content").and_then(Value::as_array))
        .flatten()
        .filter(|part| part.get("type").and_then(Value::as_str) == Some("output_text"))
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect()
}
