//! Discord 适配
//!
//! REST 负责出站调用，网关负责入站事件；[`DiscordPlatform`] 把两者接到核心层。

pub mod gateway;
pub mod rest;
mod snowflake;

use async_trait::async_trait;
use dashmap::DashMap;
use tracing::warn;

use crate::core::platform::ChatPlatform;
use crate::domain::{ChannelId, ChannelKind, InboundMessage};
use crate::errors::PlatformResult;

pub use gateway::{DiscordGateway, GatewayEvent, MessageCreate, SessionEnd};
pub use rest::{CurrentUser, DiscordRest};

/// 以 Discord 实现的聊天平台
pub struct DiscordPlatform {
    rest: DiscordRest,
    /// 频道类型缓存
    kinds: DashMap<ChannelId, ChannelKind>,
}

impl DiscordPlatform {
    pub fn new(rest: DiscordRest) -> Self {
        Self {
            rest,
            kinds: DashMap::new(),
        }
    }

    pub fn rest(&self) -> &DiscordRest {
        &self.rest
    }

    /// 记录已知线程
    pub fn remember_threads(&self, threads: impl IntoIterator<Item = ChannelId>) {
        for id in threads {
            self.kinds.insert(id, ChannelKind::Thread);
        }
    }

    /// 查询频道类型，先查缓存
    ///
    /// 查询失败时按非线程处理，不缓存结果。
    pub async fn channel_kind(&self, channel: ChannelId) -> ChannelKind {
        if let Some(kind) = self.kinds.get(&channel) {
            return *kind;
        }

        match self.rest.channel_kind(channel).await {
            Ok(kind) => {
                self.kinds.insert(channel, kind);
                kind
            }
            Err(err) => {
                warn!("Could not resolve type of channel {}: {}", channel, err);
                ChannelKind::Other
            }
        }
    }

    /// 把网关消息转成入站事件
    pub async fn inbound(&self, message: MessageCreate) -> InboundMessage {
        let channel_kind = self.channel_kind(message.channel_id).await;

        InboundMessage {
            author_id: message.author.id,
            author_is_bot: message.author.bot,
            channel_id: message.channel_id,
            channel_kind,
            content: message.content,
        }
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn create_thread(&self, parent: ChannelId, name: &str) -> PlatformResult<ChannelId> {
        let thread = self.rest.create_thread(parent, name).await?;
        self.kinds.insert(thread, ChannelKind::Thread);
        Ok(thread)
    }

    async fn send(&self, channel: ChannelId, text: &str) -> PlatformResult<()> {
        self.rest.send_message(channel, text).await
    }

    async fn archive(&self, thread: ChannelId) -> PlatformResult<()> {
        self.rest.archive_thread(thread).await
    }

    async fn trigger_typing(&self, channel: ChannelId) -> PlatformResult<()> {
        self.rest.trigger_typing(channel).await
    }
}
