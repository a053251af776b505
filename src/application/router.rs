//! 事件路由
//!
//! 把平台事件转换成存储操作和后端调用。每个处理器都是错误边界：
//! 自身的失败转换成一条聊天消息，只有回复本身发送失败时才向上返回。
//!
//! 处理器在每次平台或提供方调用处挂起，挂起期间同一线程的其他事件可能交错执行。
//! 存储操作本身是同步的，不会被打断；需要严格顺序时打开 `serialize_threads`。

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::command::{Command, CommandError};
use crate::core::dispatcher::Dispatcher;
use crate::core::locks::ThreadLocks;
use crate::core::platform::{chunk_message, ChatPlatform, MESSAGE_CHAR_LIMIT};
use crate::core::registry::ModelRegistry;
use crate::core::thread_store::ThreadStore;
use crate::domain::{BackendDescriptor, ChannelId, InboundMessage, Message, UserId};
use crate::errors::{PlatformError, RelayError, Result};

/// 路由器设置
#[derive(Debug, Clone)]
pub struct RouterSettings {
    /// 机器人自己的用户 ID
    pub bot_user_id: UserId,
    /// 命令前缀
    pub command_prefix: String,
    /// 单条消息的最大字符数
    pub chunk_limit: usize,
    /// 同一线程的消息是否串行处理
    pub serialize_threads: bool,
}

impl RouterSettings {
    pub fn new(bot_user_id: UserId) -> Self {
        Self {
            bot_user_id,
            command_prefix: "!".to_string(),
            chunk_limit: MESSAGE_CHAR_LIMIT,
            serialize_threads: false,
        }
    }

    pub fn with_command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.command_prefix = prefix.into();
        self
    }

    pub fn with_serialize_threads(mut self, serialize: bool) -> Self {
        self.serialize_threads = serialize;
        self
    }
}

/// 事件路由器
pub struct EventRouter {
    settings: RouterSettings,
    registry: Arc<ModelRegistry>,
    store: Arc<ThreadStore>,
    dispatcher: Dispatcher,
    platform: Arc<dyn ChatPlatform>,
    locks: ThreadLocks,
}

impl EventRouter {
    pub fn new(
        settings: RouterSettings,
        registry: Arc<ModelRegistry>,
        store: Arc<ThreadStore>,
        dispatcher: Dispatcher,
        platform: Arc<dyn ChatPlatform>,
    ) -> Self {
        Self {
            settings,
            registry,
            store,
            dispatcher,
            platform,
            locks: ThreadLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<ThreadStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// 处理一条收到的消息：先走命令分发，再走对话处理
    pub async fn handle(&self, message: InboundMessage) {
        if let Err(err) = self.process_commands(&message).await {
            warn!(
                "Command handling failed in channel {}: {}",
                message.channel_id, err
            );
        }

        if let Err(err) = self.on_message(&message).await {
            warn!(
                "Message handling failed in channel {}: {}",
                message.channel_id, err
            );
        }
    }

    async fn process_commands(&self, message: &InboundMessage) -> Result<()> {
        if message.author_is_bot {
            return Ok(());
        }

        let command = match Command::parse(&message.content, &self.settings.command_prefix) {
            None => return Ok(()),
            Some(Ok(command)) => command,
            Some(Err(CommandError::NotFound(name))) => {
                debug!("Ignoring unknown command '{}'", name);
                return Ok(());
            }
            Some(Err(err)) => {
                warn!("Rejected command '{}': {}", message.content, err);
                return Ok(());
            }
        };

        let channel = message.channel_id;
        let in_thread = message.in_thread();

        match command {
            Command::CreateThread { name, alias } => {
                self.create_thread(channel, &name, &alias).await
            }
            Command::ClearHistory => self.clear_history(channel, in_thread).await,
            Command::ArchiveThread => self.archive_thread(channel, in_thread).await,
            Command::CurrentModel => self.current_model(channel, in_thread).await,
        }
    }

    /// 在父频道下创建线程并绑定模型
    pub async fn create_thread(&self, parent: ChannelId, name: &str, alias: &str) -> Result<()> {
        let alias = alias.to_lowercase();
        let backend = match self.registry.resolve(&alias) {
            Ok(backend) => backend.clone(),
            Err(err) => {
                info!("Rejected thread '{}' with unknown model '{}'", name, alias);
                return self.reply(parent, &err.to_string()).await;
            }
        };

        match self.open_thread(parent, name, &alias, &backend).await {
            Ok(thread) => {
                info!("Created thread {} ('{}') using {}", thread, name, backend);
                Ok(())
            }
            Err(PlatformError::Forbidden(detail)) => {
                warn!("No permission to create thread in {}: {}", parent, detail);
                self.reply(parent, "I don't have permission to create threads!")
                    .await
            }
            Err(PlatformError::Request(detail)) => {
                warn!("Failed to create thread in {}: {}", parent, detail);
                self.reply(parent, "Failed to create thread!").await
            }
        }
    }

    async fn open_thread(
        &self,
        parent: ChannelId,
        name: &str,
        alias: &str,
        backend: &BackendDescriptor,
    ) -> std::result::Result<ChannelId, PlatformError> {
        let thread = self.platform.create_thread(parent, name).await?;
        self.store.ensure(thread, backend);

        let greeting = format!(
            "Hello! I'm ready to chat using the {} model. What would you like to discuss?",
            alias
        );
        self.platform.send(thread, &greeting).await?;
        Ok(thread)
    }

    /// 对话处理
    ///
    /// 忽略机器人自己的消息、命令消息和非线程频道的消息。
    pub async fn on_message(&self, message: &InboundMessage) -> Result<()> {
        if message.author_id == self.settings.bot_user_id {
            return Ok(());
        }
        if message.content.starts_with(&self.settings.command_prefix) {
            return Ok(());
        }
        if !message.in_thread() {
            return Ok(());
        }

        let thread = message.channel_id;
        let _guard = if self.settings.serialize_threads {
            Some(self.locks.acquire(thread).await)
        } else {
            None
        };

        // 调用失败时不回滚，用户消息会留在历史中
        self.store.ensure(thread, self.registry.default_descriptor());
        self.store
            .append_message(thread, Message::user(message.content.clone()))?;

        if let Err(err) = self.converse(thread).await {
            warn!("Conversation failed in thread {}: {}", thread, err);
            let notice = format!("Sorry, I encountered an error: {}", err);
            self.reply(thread, &notice).await?;
        }

        Ok(())
    }

    async fn converse(&self, thread: ChannelId) -> Result<()> {
        self.platform.trigger_typing(thread).await?;

        let config = self
            .store
            .get(thread)
            .ok_or(RelayError::NotConfigured(thread))?;
        let reply = self
            .dispatcher
            .complete(&config.backend, &config.history)
            .await?;

        self.store
            .append_message(thread, Message::assistant(reply.clone()))?;

        // 空回复仍记入历史，但要让用户看到失败
        let chunks = chunk_message(&reply, self.settings.chunk_limit);
        if chunks.is_empty() {
            return Err(RelayError::Dispatch(format!(
                "{} returned an empty reply",
                config.backend
            )));
        }
        for chunk in chunks {
            self.platform.send(thread, chunk).await?;
        }

        Ok(())
    }

    /// 清空当前线程的历史
    pub async fn clear_history(&self, channel: ChannelId, in_thread: bool) -> Result<()> {
        if !in_thread {
            return self.reply(channel, &RelayError::NotInThread.to_string()).await;
        }

        // 未配置的线程不回复，也不创建配置
        if self.store.clear_history(channel) {
            info!("Cleared history for thread {}", channel);
            self.reply(channel, "Conversation history cleared!").await?;
        }

        Ok(())
    }

    /// 归档当前线程
    pub async fn archive_thread(&self, channel: ChannelId, in_thread: bool) -> Result<()> {
        if !in_thread {
            return self.reply(channel, &RelayError::NotInThread.to_string()).await;
        }

        match self.platform.archive(channel).await {
            Ok(()) => {
                info!("Archived thread {}", channel);
                self.reply(channel, "Thread archived!").await
            }
            Err(PlatformError::Forbidden(detail)) => {
                warn!("No permission to archive {}: {}", channel, detail);
                self.reply(channel, "I don't have permission to archive this thread!")
                    .await
            }
            Err(PlatformError::Request(detail)) => {
                warn!("Failed to archive {}: {}", channel, detail);
                self.reply(channel, "Failed to archive thread!").await
            }
        }
    }

    /// 报告当前线程使用的模型
    pub async fn current_model(&self, channel: ChannelId, in_thread: bool) -> Result<()> {
        if !in_thread {
            return self.reply(channel, &RelayError::NotInThread.to_string()).await;
        }

        let text = match self.store.get(channel) {
            Some(config) => {
                let alias = self
                    .registry
                    .describe(&config.backend)
                    .unwrap_or(config.backend.model_id.as_str());
                format!("Current model: {}", alias)
            }
            None => format!(
                "No model configured for this thread. Using default ({})",
                self.registry.default_alias()
            ),
        };

        self.reply(channel, &text).await
    }

    async fn reply(&self, channel: ChannelId, text: &str) -> Result<()> {
        self.platform.send(channel, text).await?;
        Ok(())
    }
}
