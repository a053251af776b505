//! 平台入站事件

use super::{ChannelId, UserId};

/// 频道类型，只区分是否为线程
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Thread,
    Other,
}

/// 收到的一条消息
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub author_id: UserId,
    pub author_is_bot: bool,
    pub channel_id: ChannelId,
    pub channel_kind: ChannelKind,
    pub content: String,
}

impl InboundMessage {
    /// 消息是否发在线程里
    pub fn in_thread(&self) -> bool {
        self.channel_kind == ChannelKind::Thread
    }
}
