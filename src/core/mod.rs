//! 核心层：注册表、线程存储、后端调度与平台接口
//!
//! 不依赖任何具体平台或提供方实现

pub mod dispatcher;
pub mod locks;
pub mod platform;
pub mod registry;
pub mod thread_store;
