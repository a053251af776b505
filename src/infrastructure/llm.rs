//! OpenAI 客户端
//!
//! 使用 async-openai 调用聊天补全接口

use anyhow::{anyhow, Context, Result};
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;

use crate::core::dispatcher::CompletionProvider;
use crate::domain::{Message, Role};

/// 默认 API 地址
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI 客户端
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client<OpenAIConfig>,
    base_url: String,
}

impl OpenAIClient {
    /// 使用默认地址创建客户端
    pub fn new(api_key: String) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_OPENAI_BASE_URL.to_string())
    }

    /// 创建新的 OpenAI 客户端
    pub fn new_with_base_url(api_key: String, base_url: String) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(base_url.clone());

        let client = Client::with_config(config);

        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_messages(history: &[Message]) -> Result<Vec<ChatCompletionRequestMessage>> {
        history
            .iter()
            .map(|msg| match msg.role {
                Role::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map(ChatCompletionRequestMessage::User),
                Role::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(msg.content.clone())
                    .build()
                    .map(ChatCompletionRequestMessage::Assistant),
            })
            .collect::<Result<Vec<_>, _>>()
            .context("failed to build chat messages")
    }
}

#[async_trait]
impl CompletionProvider for OpenAIClient {
    async fn complete(
        &self,
        model_id: &str,
        history: &[Message],
        max_output_units: u32,
    ) -> Result<String> {
        let messages = Self::build_messages(history)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model_id)
            .messages(messages)
            .max_completion_tokens(max_output_units)
            .build()
            .context("failed to build chat completion request")?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("model {} returned no content", model_id))
    }
}

impl std::fmt::Debug for OpenAIClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
