//! 按线程串行化
//!
//! 可选：同一线程的消息处理依次执行，不同线程之间互不影响。

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::ChannelId;

/// 每线程一把异步锁
#[derive(Default)]
pub struct ThreadLocks {
    locks: DashMap<ChannelId, Arc<Mutex<()>>>,
}

impl ThreadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取线程锁，持有期间同线程的其他处理器等待
    pub async fn acquire(&self, thread_id: ChannelId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(thread_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }
}
