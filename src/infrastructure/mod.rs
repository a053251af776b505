//! 基础设施层：外部系统交互
//!
//! 提供与 Discord、模型提供方和日志系统的交互能力

pub mod anthropic;
pub mod discord;
pub mod llm;
pub mod logger;
