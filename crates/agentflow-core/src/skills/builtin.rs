//! Built-in skills.
//!
//! - `echo`: returns its input unchanged (wiring checks, demos)
//! - `http`: one JSON HTTP call to an external service
//! - `llm`: one chat completion through a [`ChatModel`]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::FlowError;
use crate::llm::{ChatModel, ChatRequest};
use crate::skills::{FieldSpec, FieldType, OutputField, Payload, Skill, SkillDescriptor};

// ─── echo ────────────────────────────────────────────────────────────────

pub struct EchoSkill {
    descriptor: SkillDescriptor,
}

impl EchoSkill {
    pub fn new() -> Self {
        Self {
            descriptor: SkillDescriptor::new("echo", "Return the input fields unchanged."),
        }
    }
}

impl Default for EchoSkill {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for EchoSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, input: Payload) -> Result<Payload, FlowError> {
        Ok(input)
    }
}

// ─── http ────────────────────────────────────────────────────────────────

pub struct HttpSkill {
    descriptor: SkillDescriptor,
    client: reqwest::Client,
}

impl HttpSkill {
    pub fn new(timeout: Duration) -> Self {
        let descriptor = SkillDescriptor::new(
            "http",
            "Call an external HTTP endpoint and return its JSON (or text) response.",
        )
        .input(
            "url",
            FieldSpec::required(FieldType::String).describe("Absolute URL to call"),
        )
        .input(
            "method",
            FieldSpec::optional(FieldType::String)
                .with_default(json!("GET"))
                .describe("HTTP method"),
        )
        .input(
            "headers",
            FieldSpec::optional(FieldType::Object).describe("Extra request headers"),
        )
        .input(
            "body",
            FieldSpec::optional(FieldType::Any).describe("JSON request body"),
        )
        .output("status", OutputField::new(FieldType::Integer, "HTTP status code"))
        .output("body", OutputField::new(FieldType::Any, "Parsed JSON body, or raw text"))
        .closed();

        Self {
            descriptor,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }
}

#[async_trait]
impl Skill for HttpSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, input: Payload) -> Result<Payload, FlowError> {
        let url = str_field(&input, "url").unwrap_or_default();
        let method = str_field(&input, "method").unwrap_or("GET");
        let method = reqwest::Method::from_bytes(method.to_uppercase().as_bytes())
            .map_err(|_| FlowError::SkillExecution(format!("invalid HTTP method '{}'", method)))?;

        let mut request = self.client.request(method, url);
        if let Some(Value::Object(headers)) = input.get("headers") {
            for (name, value) in headers {
                let value = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                request = request.header(name.as_str(), value);
            }
        }
        if let Some(body) = input.get("body").filter(|b| !b.is_null()) {
            request = request.json(body);
        }

        tracing::info!("[HttpSkill] {}", url);

        let response = request
            .send()
            .await
            .map_err(|e| FlowError::SkillExecution(format!("HTTP request failed: {}", e)))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| {
            FlowError::SkillExecution(format!("Failed to read response body: {}", e))
        })?;

        if !status.is_success() {
            return Err(FlowError::SkillExecution(format!(
                "{} returned {}: {}",
                url, status, text
            )));
        }

        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));

        let mut out = Payload::new();
        out.insert("status".to_string(), json!(status.as_u16()));
        out.insert("body".to_string(), body);
        Ok(out)
    }
}

// ─── llm ─────────────────────────────────────────────────────────────────

pub struct LlmSkill {
    descriptor: SkillDescriptor,
    model: Arc<dyn ChatModel>,
}

impl LlmSkill {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        let descriptor = SkillDescriptor::new(
            "llm",
            "Send a prompt to the configured language model and return its reply.",
        )
        .input("prompt", FieldSpec::required(FieldType::String).describe("User prompt"))
        .input("system", FieldSpec::optional(FieldType::String).describe("System prompt"))
        .input("temperature", FieldSpec::optional(FieldType::Number))
        .input("max_tokens", FieldSpec::optional(FieldType::Integer))
        .output("content", OutputField::new(FieldType::String, "Model reply text"))
        .output("model", OutputField::new(FieldType::String, "Model that answered"));

        Self { descriptor, model }
    }
}

#[async_trait]
impl Skill for LlmSkill {
    fn descriptor(&self) -> &SkillDescriptor {
        &self.descriptor
    }

    async fn execute(&self, input: Payload) -> Result<Payload, FlowError> {
        let request = ChatRequest {
            system: str_field(&input, "system").map(str::to_string),
            prompt: str_field(&input, "prompt").unwrap_or_default().to_string(),
            temperature: input.get("temperature").and_then(|v| v.as_f64()),
            max_tokens: input
                .get("max_tokens")
                .and_then(|v| v.as_u64())
                .map(|v| v.min(u32::MAX as u64) as u32),
        };

        let response = self.model.complete(&request).await?;

        let mut out = Payload::new();
        out.insert("content".to_string(), Value::String(response.content));
        out.insert("model".to_string(), Value::String(response.model));
        if let Some(usage) = response.usage {
            out.insert("usage".to_string(), json!(usage));
        }
        Ok(out)
    }
}

fn str_field<'a>(input: &'a Payload, field: &str) -> Option<&'a str> {
    input.get(field).and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ChatResponse;

    struct FixedModel;

    #[async_trait]
    impl ChatModel for FixedModel {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, FlowError> {
            Ok(ChatResponse {
                content: format!("reply to: {}", request.prompt),
                model: "fixed".to_string(),
                usage: None,
            })
        }
    }

    #[tokio::test]
    async fn test_echo_returns_input() {
        let input = json!({"text": "hi", "n": [1, 2]}).as_object().cloned().unwrap();
        let out = EchoSkill::new().execute(input.clone()).await.unwrap();
        assert_eq!(out, input);
    }

    #[tokio::test]
    async fn test_llm_skill_maps_reply() {
        let skill = LlmSkill::new(Arc::new(FixedModel));
        let input = skill
            .descriptor()
            .validate_input(json!({"prompt": "summarize"}).as_object().cloned().unwrap())
            .unwrap();
        let out = skill.execute(input).await.unwrap();
        assert_eq!(out["content"], json!("reply to: summarize"));
        assert_eq!(out["model"], json!("fixed"));
    }

    #[test]
    fn test_http_descriptor_is_closed() {
        let skill = HttpSkill::new(Duration::from_secs(5));
        let err = skill
            .descriptor()
            .validate_input(json!({"url": "http://x", "verb": "GET"}).as_object().cloned().unwrap())
            .unwrap_err();
        assert_eq!(err.kind(), "schema_validation");
    }
}
