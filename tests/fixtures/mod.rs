//! 测试 Fixtures
//!
//! 提供记录调用的平台替身和可编排的模型提供方
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use thread_relay::core::platform::ChatPlatform;
use thread_relay::errors::PlatformResult;
use thread_relay::{
    ChannelId, ChannelKind, CompletionProvider, Dispatcher, EventRouter, InboundMessage, Message,
    ModelRegistry, PlatformError, RouterSettings, ThreadStore,
};

/// 机器人自己的用户 ID
pub const BOT_ID: u64 = 1;
/// 普通用户 ID
pub const USER_ID: u64 = 42;
/// 创建线程用的父频道
pub const PARENT_CHANNEL: ChannelId = 100;
/// 第一个新建线程的 ID
pub const FIRST_THREAD: ChannelId = 1000;

static INIT: Once = Once::new();

/// 初始化测试日志
pub fn setup() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// 平台调用记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCall {
    CreateThread { parent: ChannelId, name: String },
    Send { channel: ChannelId, text: String },
    Archive { thread: ChannelId },
    Typing { channel: ChannelId },
}

/// 记录所有调用的平台替身
pub struct MockPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    next_thread: AtomicU64,
    create_error: Mutex<Option<PlatformError>>,
    archive_error: Mutex<Option<PlatformError>>,
    typing_error: Mutex<Option<PlatformError>>,
    send_error: Mutex<Option<PlatformError>>,
    send_failures: Mutex<VecDeque<PlatformError>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_thread: AtomicU64::new(FIRST_THREAD),
            create_error: Mutex::new(None),
            archive_error: Mutex::new(None),
            typing_error: Mutex::new(None),
            send_error: Mutex::new(None),
            send_failures: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fail_create(&self, err: PlatformError) {
        *self.create_error.lock().unwrap() = Some(err);
    }

    pub fn fail_archive(&self, err: PlatformError) {
        *self.archive_error.lock().unwrap() = Some(err);
    }

    pub fn fail_typing(&self, err: PlatformError) {
        *self.typing_error.lock().unwrap() = Some(err);
    }

    /// 之后的每次发送都失败
    pub fn fail_send(&self, err: PlatformError) {
        *self.send_error.lock().unwrap() = Some(err);
    }

    /// 只让下一次发送失败
    pub fn fail_next_send(&self, err: PlatformError) {
        self.send_failures.lock().unwrap().push_back(err);
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    /// 发往某个频道的全部文本
    pub fn sent(&self, channel: ChannelId) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                PlatformCall::Send { channel: c, text } if c == channel => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn created_threads(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, PlatformCall::CreateThread { .. }))
            .count()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn create_thread(&self, parent: ChannelId, name: &str) -> PlatformResult<ChannelId> {
        self.record(PlatformCall::CreateThread {
            parent,
            name: name.to_string(),
        });
        if let Some(err) = self.create_error.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self.next_thread.fetch_add(1, Ordering::SeqCst))
    }

    async fn send(&self, channel: ChannelId, text: &str) -> PlatformResult<()> {
        self.record(PlatformCall::Send {
            channel,
            text: text.to_string(),
        });
        if let Some(err) = self.send_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        match self.send_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn archive(&self, thread: ChannelId) -> PlatformResult<()> {
        self.record(PlatformCall::Archive { thread });
        match self.archive_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn trigger_typing(&self, channel: ChannelId) -> PlatformResult<()> {
        self.record(PlatformCall::Typing { channel });
        match self.typing_error.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// 一次提供方调用
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub model_id: String,
    pub history: Vec<Message>,
    pub max_output_units: u32,
}

/// 按脚本回复的提供方；脚本用完后回复 "ok"
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Ok(text.into()));
        self
    }

    pub fn fail(self, message: impl Into<String>) -> Self {
        self.replies.lock().unwrap().push_back(Err(message.into()));
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(
        &self,
        model_id: &str,
        history: &[Message],
        max_output_units: u32,
    ) -> anyhow::Result<String> {
        self.calls.lock().unwrap().push(ProviderCall {
            model_id: model_id.to_string(),
            history: history.to_vec(),
            max_output_units,
        });

        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok("ok".to_string()),
        }
    }
}

/// 永不返回的提供方
pub struct HangingProvider;

#[async_trait]
impl CompletionProvider for HangingProvider {
    async fn complete(&self, _: &str, _: &[Message], _: u32) -> anyhow::Result<String> {
        std::future::pending().await
    }
}

/// 测试环境
pub struct Harness {
    pub router: Arc<EventRouter>,
    pub platform: Arc<MockPlatform>,
    pub anthropic: Arc<ScriptedProvider>,
    pub openai: Arc<ScriptedProvider>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_providers(ScriptedProvider::new(), ScriptedProvider::new())
    }

    pub fn with_providers(anthropic: ScriptedProvider, openai: ScriptedProvider) -> Self {
        setup();
        let platform = Arc::new(MockPlatform::new());
        let anthropic = Arc::new(anthropic);
        let openai = Arc::new(openai);

        let router = build_router(
            RouterSettings::new(BOT_ID),
            platform.clone(),
            Dispatcher::new(anthropic.clone(), openai.clone()),
        );

        Self {
            router: Arc::new(router),
            platform,
            anthropic,
            openai,
        }
    }

    pub fn store(&self) -> &Arc<ThreadStore> {
        self.router.store()
    }

    pub async fn say_in_thread(&self, thread: ChannelId, content: &str) {
        self.router.handle(thread_message(thread, content)).await;
    }

    pub async fn say_in_channel(&self, channel: ChannelId, content: &str) {
        self.router.handle(channel_message(channel, content)).await;
    }
}

pub fn build_router(
    settings: RouterSettings,
    platform: Arc<dyn ChatPlatform>,
    dispatcher: Dispatcher,
) -> EventRouter {
    EventRouter::new(
        settings,
        Arc::new(ModelRegistry::builtin()),
        Arc::new(ThreadStore::new()),
        dispatcher,
        platform,
    )
}

/// 用户在线程里发的消息
pub fn thread_message(thread: ChannelId, content: &str) -> InboundMessage {
    InboundMessage {
        author_id: USER_ID,
        author_is_bot: false,
        channel_id: thread,
        channel_kind: ChannelKind::Thread,
        content: content.to_string(),
    }
}

/// 用户在普通频道里发的消息
pub fn channel_message(channel: ChannelId, content: &str) -> InboundMessage {
    InboundMessage {
        author_id: USER_ID,
        author_is_bot: false,
        channel_id: channel,
        channel_kind: ChannelKind::Other,
        content: content.to_string(),
    }
}
