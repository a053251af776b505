//! 聊天平台能力接口
//!
//! 路由器只通过这个 trait 与平台交互，便于在测试中替换。

use async_trait::async_trait;

use crate::domain::ChannelId;
use crate::errors::PlatformResult;

/// 单条消息的最大字符数
pub const MESSAGE_CHAR_LIMIT: usize = 2000;

#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// 在父频道下创建公开线程，返回线程 ID
    async fn create_thread(&self, parent: ChannelId, name: &str) -> PlatformResult<ChannelId>;

    /// 发送纯文本
    async fn send(&self, channel: ChannelId, text: &str) -> PlatformResult<()>;

    /// 归档线程
    async fn archive(&self, thread: ChannelId) -> PlatformResult<()>;

    /// 显示"正在输入"
    async fn trigger_typing(&self, _channel: ChannelId) -> PlatformResult<()> {
        Ok(())
    }
}

/// 按位置把文本切成不超过 `limit` 个字符的片段
///
/// 不考虑单词边界；空文本不产生片段。
pub fn chunk_message(text: &str, limit: usize) -> Vec<&str> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let split_at = rest
            .char_indices()
            .nth(limit)
            .map(|(idx, _)| idx)
            .unwrap_or(rest.len());
        let (head, tail) = rest.split_at(split_at);
        chunks.push(head);
        rest = tail;
    }

    chunks
}
