use clap::Parser;

use crate::core::dispatcher::DEFAULT_MAX_OUTPUT_UNITS;
use crate::core::thread_store::HISTORY_LIMIT;
use crate::errors::{RelayError, Result};
use crate::infrastructure::anthropic::DEFAULT_ANTHROPIC_BASE_URL;
use crate::infrastructure::discord::rest::DEFAULT_DISCORD_API_URL;
use crate::infrastructure::llm::DEFAULT_OPENAI_BASE_URL;

#[derive(Parser, Clone)]
#[command(
    author,
    version,
    about = "Relay Discord threads to Anthropic and OpenAI chat models"
)]
pub struct AppConfig {
    // 密钥：缺失时启动失败
    /// Discord 机器人 token
    #[arg(long, env = "DISCORD_KEY", hide_env_values = true)]
    pub discord_token: String,

    #[arg(long, env = "ANTHROPIC_KEY", hide_env_values = true)]
    pub anthropic_key: String,

    #[arg(long, env = "OPENAI_KEY", hide_env_values = true)]
    pub openai_key: String,

    /// 命令前缀
    #[arg(long, env = "COMMAND_PREFIX", default_value = "!")]
    pub command_prefix: String,

    /// 单次回复的最大输出 token 数
    #[arg(long, env = "MAX_OUTPUT_UNITS", default_value_t = DEFAULT_MAX_OUTPUT_UNITS)]
    pub max_output_units: u32,

    /// 每个线程保留的历史条数
    #[arg(long, env = "HISTORY_LIMIT", default_value_t = HISTORY_LIMIT)]
    pub history_limit: usize,

    /// 同一线程的消息串行处理
    #[arg(long, env = "SERIALIZE_THREADS")]
    pub serialize_threads: bool,

    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_OPENAI_BASE_URL)]
    pub openai_base_url: String,

    #[arg(long, env = "ANTHROPIC_BASE_URL", default_value = DEFAULT_ANTHROPIC_BASE_URL)]
    pub anthropic_base_url: String,

    #[arg(long, env = "DISCORD_API_URL", default_value = DEFAULT_DISCORD_API_URL)]
    pub discord_api_url: String,
}

impl AppConfig {
    /// 校验 clap 无法表达的约束
    pub fn validate(&self) -> Result<()> {
        let secrets = [
            ("DISCORD_KEY", &self.discord_token),
            ("ANTHROPIC_KEY", &self.anthropic_key),
            ("OPENAI_KEY", &self.openai_key),
        ];
        for (name, value) in secrets {
            if value.trim().is_empty() {
                return Err(RelayError::Config(format!("{} must not be empty", name)));
            }
        }

        if self.command_prefix.is_empty() {
            return Err(RelayError::Config("command prefix must not be empty".to_string()));
        }
        if self.history_limit == 0 {
            return Err(RelayError::Config("history limit must be at least 1".to_string()));
        }
        if self.max_output_units == 0 {
            return Err(RelayError::Config(
                "max output units must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("command_prefix", &self.command_prefix)
            .field("max_output_units", &self.max_output_units)
            .field("history_limit", &self.history_limit)
            .field("serialize_threads", &self.serialize_threads)
            .field("openai_base_url", &self.openai_base_url)
            .field("anthropic_base_url", &self.anthropic_base_url)
            .field("discord_api_url", &self.discord_api_url)
            .finish_non_exhaustive()
    }
}
