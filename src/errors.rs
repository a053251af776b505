//! 标准化错误处理
//!
//! 定义中继专用的错误类型。每个事件处理器都是一个边界，
//! 这里的错误最终会被转换成一条聊天消息或一条日志。

use thiserror::Error;

use crate::domain::ChannelId;

/// 聊天平台错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// 机器人缺少执行该操作的权限（HTTP 403）
    #[error("Missing permissions: {0}")]
    Forbidden(String),

    /// 其他任何请求失败
    #[error("Platform request failed: {0}")]
    Request(String),
}

/// 项目主要错误类型
#[derive(Error, Debug)]
pub enum RelayError {
    /// 未知的模型别名
    #[error("Invalid model! Available models: {}", .available.join(", "))]
    InvalidAlias {
        alias: String,
        available: Vec<String>,
    },

    /// 聊天平台错误
    #[error(transparent)]
    Platform(#[from] PlatformError),

    /// 模型提供方调用失败，原因原样保留
    #[error("{0}")]
    Dispatch(String),

    /// 命令必须在线程内使用
    #[error("This command can only be used in threads!")]
    NotInThread,

    /// 线程尚未配置
    #[error("Thread {0} is not configured")]
    NotConfigured(ChannelId),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),
}

/// 项目结果类型别名
pub type Result<T> = std::result::Result<T, RelayError>;

/// 平台结果类型别名
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;
