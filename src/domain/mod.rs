//! Domain Layer
//!
//! Core entity definitions shared by the registry, store and router

pub mod event;
pub mod message;
pub mod model;

pub use event::*;
pub use message::*;
pub use model::*;

/// 平台分配的频道 / 线程 ID（Discord snowflake）
pub type ChannelId = u64;

/// 平台分配的用户 ID
pub type UserId = u64;
