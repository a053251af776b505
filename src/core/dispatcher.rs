//! 后端调度
//!
//! 根据后端描述选择提供方客户端，发送完整历史，取回一段回复文本

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{BackendDescriptor, Message, Provider};
use crate::errors::{RelayError, Result};

/// 单次回复的默认输出上限
pub const DEFAULT_MAX_OUTPUT_UNITS: u32 = 1000;

/// 模型提供方接口
///
/// 每个提供方家族一个实现。历史按从旧到新的顺序传入。
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        model_id: &str,
        history: &[Message],
        max_output_units: u32,
    ) -> anyhow::Result<String>;
}

/// 后端调度器
#[derive(Clone)]
pub struct Dispatcher {
    anthropic: Arc<dyn CompletionProvider>,
    openai: Arc<dyn CompletionProvider>,
    max_output_units: u32,
}

impl Dispatcher {
    pub fn new(
        anthropic: Arc<dyn CompletionProvider>,
        openai: Arc<dyn CompletionProvider>,
    ) -> Self {
        Self {
            anthropic,
            openai,
            max_output_units: DEFAULT_MAX_OUTPUT_UNITS,
        }
    }

    pub fn with_max_output_units(mut self, max_output_units: u32) -> Self {
        self.max_output_units = max_output_units;
        self
    }

    pub fn max_output_units(&self) -> u32 {
        self.max_output_units
    }

    fn provider(&self, provider: Provider) -> &dyn CompletionProvider {
        match provider {
            Provider::Anthropic => self.anthropic.as_ref(),
            Provider::OpenAi => self.openai.as_ref(),
        }
    }

    /// 调用一次后端；不重试，不流式
    pub async fn complete(
        &self,
        descriptor: &BackendDescriptor,
        history: &[Message],
    ) -> Result<String> {
        debug!(
            "Dispatching {} messages to {}",
            history.len(),
            descriptor
        );

        self.provider(descriptor.provider)
            .complete(&descriptor.model_id, history, self.max_output_units)
            .await
            .map_err(|err| RelayError::Dispatch(format!("{:#}", err)))
    }
}
