use anyhow::Result;
use async_trait::async_trait;

/// A single-shot chat completion: one system instruction, one user prompt,
/// the model's full text reply back.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;

    fn model_name(&self) -> &str;
}
