//! Language-model adapter — single-shot chat completions over HTTP.
//!
//! The engine never talks to a model directly. This adapter backs the
//! built-in `llm` skill and the [`LlmPlanner`](crate::orchestration::LlmPlanner)
//! used on the adaptive path.
//!
//! Two wire formats are supported:
//!
//! - Anthropic Messages API: `POST {base_url}/v1/messages`
//! - OpenAI-compatible chat completions: `POST {base_url}/chat/completions`

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::FlowError;

/// Which wire format a model endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    #[default]
    Anthropic,
    #[serde(alias = "opencode")]
    OpenAi,
}

impl std::str::FromStr for Provider {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(Provider::Anthropic),
            "openai" | "opencode" => Ok(Provider::OpenAi),
            other => Err(FlowError::NotFound(format!("model provider '{}'", other))),
        }
    }
}

/// Connection settings for a model endpoint.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl ModelConfig {
    /// Resolve the configuration from environment variables.
    ///
    /// - `AGENTFLOW_LLM_PROVIDER`: `anthropic` (default) or `openai`
    /// - `ANTHROPIC_BASE_URL` / `OPENAI_BASE_URL`
    /// - `ANTHROPIC_AUTH_TOKEN` or `ANTHROPIC_API_KEY` / `OPENAI_API_KEY`
    /// - `ANTHROPIC_MODEL` / `OPENAI_MODEL`
    /// - `AGENTFLOW_LLM_TIMEOUT_SECS` (default 300)
    pub fn from_env() -> Result<Self, FlowError> {
        let provider = match std::env::var("AGENTFLOW_LLM_PROVIDER") {
            Ok(p) => p.parse()?,
            Err(_) => Provider::default(),
        };

        let timeout_secs = std::env::var("AGENTFLOW_LLM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(300);

        let (base_url, api_key, model) = match provider {
            Provider::Anthropic => (
                std::env::var("ANTHROPIC_BASE_URL")
                    .unwrap_or_else(|_| "https://api.anthropic.com".to_string()),
                std::env::var("ANTHROPIC_AUTH_TOKEN")
                    .or_else(|_| std::env::var("ANTHROPIC_API_KEY"))
                    .unwrap_or_default(),
                std::env::var("ANTHROPIC_MODEL")
                    .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            ),
            Provider::OpenAi => (
                std::env::var("OPENAI_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                std::env::var("OPENAI_API_KEY").unwrap_or_default(),
                std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            ),
        };

        if api_key.is_empty() {
            return Err(FlowError::NotFound(
                "no API key found; set ANTHROPIC_AUTH_TOKEN, ANTHROPIC_API_KEY or OPENAI_API_KEY"
                    .to_string(),
            ));
        }

        Ok(Self {
            provider,
            base_url,
            api_key,
            model,
            max_tokens: 8192,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// A single-shot completion request.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub model: String,
    pub usage: Option<UsageInfo>,
}

/// Anything that can answer a [`ChatRequest`].
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, FlowError>;
}

/// [`ChatModel`] backed by a remote HTTP endpoint.
pub struct HttpChatModel {
    client: reqwest::Client,
    config: ModelConfig,
}

impl HttpChatModel {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(config.timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            config,
        }
    }

    async fn post_json(
        &self,
        request: reqwest::RequestBuilder,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, FlowError> {
        let response = request
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| FlowError::SkillExecution(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| {
            FlowError::SkillExecution(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(FlowError::SkillExecution(format!(
                "API returned {}: {}",
                status, text
            )));
        }

        serde_json::from_str(&text)
            .map_err(|e| FlowError::SkillExecution(format!("Failed to parse response JSON: {}", e)))
    }

    async fn call_anthropic(&self, request: &ChatRequest) -> Result<ChatResponse, FlowError> {
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "max_tokens": request.max_tokens.unwrap_or(self.config.max_tokens),
            "messages": [{ "role": "user", "content": request.prompt }]
        });
        if let Some(ref system) = request.system {
            body["system"] = serde_json::Value::String(system.clone());
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::info!(
            "[ChatModel] Calling Anthropic API: {} (model: {})",
            url,
            self.config.model
        );

        let json = self
            .post_json(
                self.client
                    .post(&url)
                    .header("x-api-key", &self.config.api_key)
                    .header("anthropic-version", "2023-06-01"),
                &body,
            )
            .await?;
        Ok(parse_anthropic_response(&json, &self.config.model))
    }

    async fn call_openai(&self, request: &ChatRequest) -> Result<ChatResponse, FlowError> {
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let mut messages = vec![];
        if let Some(ref system) = request.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.push(serde_json::json!({ "role": "user", "content": request.prompt }));

        let mut body = serde_json::json!({
            "model": self.config.model,
            "messages": messages
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        if let Some(temp) = request.temperature {
            body["temperature"] = serde_json::json!(temp);
        }

        tracing::info!(
            "[ChatModel] Calling OpenAI-compatible API: {} (model: {})",
            url,
            self.config.model
        );

        let json = self
            .post_json(
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.config.api_key)),
                &body,
            )
            .await?;
        Ok(parse_openai_response(&json, &self.config.model))
    }
}

#[async_trait]
impl ChatModel for HttpChatModel {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, FlowError> {
        match self.config.provider {
            Provider::Anthropic => self.call_anthropic(request).await,
            Provider::OpenAi => self.call_openai(request).await,
        }
    }
}

/// Extract text blocks, model and usage from a Messages API response.
fn parse_anthropic_response(json: &serde_json::Value, fallback_model: &str) -> ChatResponse {
    let content = json
        .get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .unwrap_or_default();

    let usage = json.get("usage").map(|u| UsageInfo {
        input_tokens: u.get("input_tokens").and_then(|v| v.as_u64()),
        output_tokens: u.get("output_tokens").and_then(|v| v.as_u64()),
    });

    ChatResponse {
        content,
        model: response_model(json, fallback_model),
        usage,
    }
}

/// Extract the first choice, model and usage from a chat completions response.
fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> ChatResponse {
    let content = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string();

    let usage = json.get("usage").map(|u| UsageInfo {
        input_tokens: u
            .get("prompt_tokens")
            .or_else(|| u.get("input_tokens"))
            .and_then(|v| v.as_u64()),
        output_tokens: u
            .get("completion_tokens")
            .or_else(|| u.get("output_tokens"))
            .and_then(|v| v.as_u64()),
    });

    ChatResponse {
        content,
        model: response_model(json, fallback_model),
        usage,
    }
}

fn response_model(json: &serde_json::Value, fallback: &str) -> String {
    json.get("model")
        .and_then(|m| m.as_str())
        .unwrap_or(fallback)
        .to_string()
}
