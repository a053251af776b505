//! Anthropic 客户端
//!
//! 直接用 reqwest 调用 Messages API

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use crate::core::dispatcher::CompletionProvider;
use crate::domain::{Message, Role};

/// 默认 API 地址
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Messages API 请求体
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub model: &'a str,
    pub max_tokens: u32,
    pub messages: Vec<MessageParam<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageParam<'a> {
    pub role: Role,
    pub content: &'a str,
}

/// Messages API 响应体
#[derive(Debug, Deserialize)]
pub struct MessageResponse {
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

/// Anthropic 客户端
#[derive(Clone)]
pub struct AnthropicClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::new_with_base_url(api_key, DEFAULT_ANTHROPIC_BASE_URL)
    }

    pub fn new_with_base_url(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key).context("invalid API key header")?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static(ANTHROPIC_VERSION));
        Ok(headers)
    }

    /// 发送一次 create message 请求
    pub async fn create_message(&self, request: &CreateMessageRequest<'_>) -> Result<MessageResponse> {
        let url = format!("{}/v1/messages", self.base_url);

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .context("failed to reach Anthropic API")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("failed to read Anthropic response")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| format!("{}: {}", e.error.kind, e.error.message))
                .unwrap_or(body);
            bail!("Error code: {} - {}", status.as_u16(), detail);
        }

        serde_json::from_str(&body).context("failed to parse Anthropic response")
    }
}

#[async_trait]
impl CompletionProvider for AnthropicClient {
    async fn complete(
        &self,
        model_id: &str,
        history: &[Message],
        max_output_units: u32,
    ) -> Result<String> {
        let request = CreateMessageRequest {
            model: model_id,
            max_tokens: max_output_units,
            messages: history
                .iter()
                .map(|msg| MessageParam {
                    role: msg.role,
                    content: &msg.content,
                })
                .collect(),
        };

        let response = self.create_message(&request).await?;

        response
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::Text { text } => Some(text),
                ContentBlock::Other => None,
            })
            .ok_or_else(|| anyhow!("model {} returned no text content", model_id))
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
