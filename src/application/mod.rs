//! 应用层：命令解析与事件编排

pub mod command;
pub mod router;

pub use command::{Command, CommandError};
pub use router::{EventRouter, RouterSettings};
