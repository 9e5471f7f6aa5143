//! OpenAI chat completions, or any endpoint that speaks the same protocol
//! (local gateways, proxies) via `with_base_url`.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::http::{http_client, send_json};
use crate::traits::ChatModel;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const TEMPERATURE: f32 = 0.4;

#[derive(Clone)]
pub struct OpenAi {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 2048,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn request_body<'a>(&'a self, system: &'a str, user: &'a str) -> CompletionRequest<'a> {
        let reasoning = is_reasoning_model(&self.model);
        CompletionRequest {
            model: &self.model,
            messages: [
                Turn {
                    role: "system",
                    content: system,
                },
                Turn {
                    role: "user",
                    content: user,
                },
            ],
            max_tokens: (!reasoning).then_some(self.max_tokens),
            max_completion_tokens: reasoning.then_some(self.max_tokens),
            temperature: (!reasoning).then_some(TEMPERATURE),
        }
    }
}

/// Reasoning-family models reject `max_tokens` and any non-default temperature.
fn is_reasoning_model(model: &str) -> bool {
    ["o1", "o3", "o4", "gpt-5"]
        .iter()
        .any(|prefix| model.starts_with(prefix))
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: [Turn<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ChatModel for OpenAi {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        debug!(model = %self.model, base_url = %self.base_url, "OpenAI request");

        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(system, user));
        let reply: CompletionResponse = send_json("OpenAI", request).await?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or_else(|| anyhow!("OpenAI reply contained no message"))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
