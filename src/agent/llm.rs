use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;

use crate::config::AgentConfig;
use crate::types::{ChatRequest, ChatResponse, Message, Tool};

/// 推理服务：给定对话与可用函数，返回一条助手消息
/// （最终文本，或工具调用请求）
#[async_trait]
pub trait ReasoningService: Send + Sync {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<Message>;
}

/// OpenAI 兼容的 chat completions 客户端
pub struct LlmClient {
    client: Client,
    config: AgentConfig,
}

impl LlmClient {
    pub fn new(config: AgentConfig) -> Self {
        LlmClient {
            client: Client::new(),
            config,
        }
    }

    fn request(&self, messages: &[Message], tools: &[Tool]) -> ChatRequest {
        let (tools, tool_choice) = if tools.is_empty() {
            (None, None)
        } else {
            (Some(tools.to_vec()), Some("auto".to_string()))
        };

        ChatRequest {
            model: self.config.model.clone(),
            messages: messages.to_vec(),
            tools,
            tool_choice,
        }
    }
}

#[async_trait]
impl ReasoningService for LlmClient {
    async fn complete(&self, messages: &[Message], tools: &[Tool]) -> Result<Message> {
        let request = self.request(messages, tools);
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .context("chat completions request failed")?;

        let status = response.status();
        let text = response.text().await.context("failed to read chat completions response")?;

        if !status.is_success() {
            return Err(anyhow::anyhow!("chat completions API error: {} - {}", status, text));
        }

        let chat: ChatResponse = serde_json::from_str(&text)
            .with_context(|| format!("failed to parse chat completions response: {}", text))?;

        if let Some(err) = chat.error {
            return Err(anyhow::anyhow!("chat completions error: {}", err));
        }

        chat.choices
            .into_iter()
            .next()
            .map(|choice| choice.message)
            .context("chat completions response has no choices")
    }
}
