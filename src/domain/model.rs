//! 模型后端描述

use std::fmt;

use serde::{Deserialize, Serialize};

/// 模型提供方家族
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Anthropic,
    OpenAi,
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provider::Anthropic => write!(f, "anthropic"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

/// 后端描述：提供方 + 具体模型 ID
///
/// 由注册表持有，按值复制进线程配置。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub provider: Provider,
    pub model_id: String,
}

impl BackendDescriptor {
    pub fn new(provider: Provider, model_id: impl Into<String>) -> Self {
        Self {
            provider,
            model_id: model_id.into(),
        }
    }

    pub fn anthropic(model_id: impl Into<String>) -> Self {
        Self::new(Provider::Anthropic, model_id)
    }

    pub fn openai(model_id: impl Into<String>) -> Self {
        Self::new(Provider::OpenAi, model_id)
    }
}

impl fmt::Display for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.provider, self.model_id)
    }
}
