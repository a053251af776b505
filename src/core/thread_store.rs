//! 线程存储
//!
//! 线程 ID 到 {后端, 有界历史} 的内存映射，进程退出即丢失。
//! 所有方法都是同步的，不会跨 await 持有分片锁。

use dashmap::DashMap;
use tracing::debug;

use crate::domain::{BackendDescriptor, ChannelId, Message};
use crate::errors::{RelayError, Result};

/// 每个线程保留的历史条数
pub const HISTORY_LIMIT: usize = 10;

/// 单个线程的配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadConfig {
    pub backend: BackendDescriptor,
    pub history: Vec<Message>,
}

impl ThreadConfig {
    fn new(backend: BackendDescriptor) -> Self {
        Self {
            backend,
            history: Vec::new(),
        }
    }
}

/// 内存线程存储
pub struct ThreadStore {
    threads: DashMap<ChannelId, ThreadConfig>,
    history_limit: usize,
}

impl ThreadStore {
    /// 创建新的线程存储
    pub fn new() -> Self {
        Self::with_history_limit(HISTORY_LIMIT)
    }

    /// 自定义历史上限
    pub fn with_history_limit(history_limit: usize) -> Self {
        Self {
            threads: DashMap::new(),
            history_limit: history_limit.max(1),
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    /// 返回已有配置，不存在时用默认后端创建
    pub fn ensure(&self, thread_id: ChannelId, default: &BackendDescriptor) -> ThreadConfig {
        self.threads
            .entry(thread_id)
            .or_insert_with(|| {
                debug!("Initializing thread {} with {}", thread_id, default);
                ThreadConfig::new(default.clone())
            })
            .value()
            .clone()
    }

    /// 设置后端；已有线程保留历史
    pub fn set_backend(&self, thread_id: ChannelId, backend: BackendDescriptor) {
        self.threads
            .entry(thread_id)
            .and_modify(|config| config.backend = backend.clone())
            .or_insert_with(|| ThreadConfig::new(backend));
    }

    /// 追加消息并截断到最新的 `history_limit` 条
    ///
    /// 返回追加后的历史长度。
    pub fn append_message(&self, thread_id: ChannelId, message: Message) -> Result<usize> {
        let mut config = self
            .threads
            .get_mut(&thread_id)
            .ok_or(RelayError::NotConfigured(thread_id))?;

        config.history.push(message);
        let overflow = config.history.len().saturating_sub(self.history_limit);
        if overflow > 0 {
            config.history.drain(..overflow);
        }

        Ok(config.history.len())
    }

    /// 清空历史；线程未配置时什么也不做
    ///
    /// 返回线程此前是否已配置。
    pub fn clear_history(&self, thread_id: ChannelId) -> bool {
        match self.threads.get_mut(&thread_id) {
            Some(mut config) => {
                config.history.clear();
                true
            }
            None => false,
        }
    }

    /// 获取线程配置快照
    pub fn get(&self, thread_id: ChannelId) -> Option<ThreadConfig> {
        self.threads.get(&thread_id).map(|config| config.value().clone())
    }

    /// 获取历史快照
    pub fn history(&self, thread_id: ChannelId) -> Option<Vec<Message>> {
        self.threads
            .get(&thread_id)
            .map(|config| config.history.clone())
    }

    pub fn contains(&self, thread_id: ChannelId) -> bool {
        self.threads.contains_key(&thread_id)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }
}

impl Default for ThreadStore {
    fn default() -> Self {
        Self::new()
    }
}
