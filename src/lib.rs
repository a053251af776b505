//! Discord 线程对话中继
//!
//! 把 Discord 线程里的对话转发给可插拔的 LLM 后端：
//! - 模型注册表（别名 → 提供方 + 模型 ID）
//! - 线程存储（每线程后端 + 最近 10 条历史，仅内存）
//! - 后端调度（Anthropic / OpenAI）
//! - 事件路由（`!ct`、`!clearhistory`、`!archivethread`、`!currentmodel` 和普通消息）
//!
//! # 架构分层
//!
//! - `domain`: 领域实体
//! - `core`: 核心层，注册表、存储、调度与平台接口
//! - `infrastructure`: 基础设施层，Discord、模型提供方、日志
//! - `application`: 应用层，命令解析与事件编排

pub mod application;
pub mod bootstrap;
pub mod config;
pub mod core;
pub mod domain;
pub mod errors;
pub mod infrastructure;

pub use application::{Command, EventRouter, RouterSettings};
pub use config::AppConfig;
pub use crate::core::dispatcher::{CompletionProvider, Dispatcher};
pub use crate::core::platform::{chunk_message, ChatPlatform};
pub use crate::core::registry::ModelRegistry;
pub use crate::core::thread_store::{ThreadConfig, ThreadStore};
pub use domain::{BackendDescriptor, ChannelId, ChannelKind, InboundMessage, Message, Provider, Role};
pub use errors::{PlatformError, RelayError};

/// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
