//! Anthropic Messages API.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http::{http_client, send_json};
use crate::traits::ChatModel;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const TEMPERATURE: f32 = 0.4;

#[derive(Clone)]
pub struct Claude {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_tokens: u32,
    base_url: String,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: http_client(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens: 2048,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point at a proxy or compatible gateway. A trailing `/` is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Turn<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<Block>,
    #[serde(default)]
    stop_reason: Option<String>,
}

// Non-text blocks (tool_use, thinking) are ignored.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[async_trait]
impl ChatModel for Claude {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: [Turn {
                role: "user",
                content: user,
            }],
            temperature: TEMPERATURE,
        };
        debug!(model = %self.model, prompt_chars = user.chars().count(), "Claude request");

        let request = self
            .http
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);
        let reply: MessagesResponse = send_json("Claude", request).await?;

        if reply.stop_reason.as_deref() == Some("max_tokens") {
            warn!(model = %self.model, max_tokens = self.max_tokens, "Claude reply truncated");
        }

        let text: String = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                Block::Text { text } => Some(text),
                Block::Other => None,
            })
            .collect();
        if text.is_empty() {
            bail!("Claude reply contained no text");
        }
        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_base_url_drops_trailing_slash() {
        let ai = Claude::new("sk-ant-test", "claude-haiku").with_base_url("https://proxy.local/v1/");
        assert_eq!(ai.base_url, "https://proxy.local/v1");
        assert_eq!(ai.model_name(), "claude-haiku");
    }

    #[tokio::test]
    async fn test_complete_sends_system_and_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "sk-ant-test"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(serde_json::json!({
                "model": "claude-haiku",
                "system": "judge salons",
                "messages": [{"role": "user", "content": "@hair_by_mei"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "text", "text": "{\"score\": "},
                    {"type": "thinking", "thinking": "hmm"},
                    {"type": "text", "text": "7}"}
                ],
                "stop_reason": "end_turn"
            })))
            .mount(&server)
            .await;

        let ai = Claude::new("sk-ant-test", "claude-haiku").with_base_url(server.uri());
        let reply = ai.complete("judge salons", "@hair_by_mei").await.unwrap();
        assert_eq!(reply, "{\"score\": 7}");
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let ai = Claude::new("sk-ant-test", "claude-haiku").with_base_url(server.uri());
        let err = ai.complete("system", "user").await.unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn test_reply_without_text_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })),
            )
            .mount(&server)
            .await;

        let ai = Claude::new("sk-ant-test", "claude-haiku").with_base_url(server.uri());
        assert!(ai.complete("system", "user").await.is_err());
    }
}
