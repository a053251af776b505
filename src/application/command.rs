//! 前缀命令解析
//!
//! 参数以空白分隔，双引号可把多个单词合成一个参数。

use thiserror::Error;

use crate::core::registry::DEFAULT_ALIAS;

/// 已识别的命令
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ct <threadName> [alias]`
    CreateThread { name: String, alias: String },
    /// `clearhistory`
    ClearHistory,
    /// `archivethread`
    ArchiveThread,
    /// `currentmodel`
    CurrentModel,
}

/// 命令解析错误，不回复用户，只记日志
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Command \"{0}\" is not found")]
    NotFound(String),

    #[error("{0} is a required argument that is missing.")]
    MissingArgument(&'static str),

    #[error("Expected closing quote")]
    UnclosedQuote,
}

impl Command {
    /// 解析一条消息
    ///
    /// 不以前缀开头时返回 `None`。
    pub fn parse(content: &str, prefix: &str) -> Option<Result<Command, CommandError>> {
        let body = content.strip_prefix(prefix)?;
        Some(Self::parse_body(body))
    }

    fn parse_body(body: &str) -> Result<Command, CommandError> {
        // 前缀后必须紧跟命令名
        if body.starts_with(char::is_whitespace) {
            return Err(CommandError::NotFound(String::new()));
        }

        let mut args = split_args(body)?.into_iter();
        let name = args.next().unwrap_or_default();

        match name.as_str() {
            "ct" => {
                let name = args
                    .next()
                    .ok_or(CommandError::MissingArgument("thread_name"))?;
                let alias = args
                    .next()
                    .unwrap_or_else(|| DEFAULT_ALIAS.to_string())
                    .to_lowercase();
                Ok(Command::CreateThread { name, alias })
            }
            "clearhistory" => Ok(Command::ClearHistory),
            "archivethread" => Ok(Command::ArchiveThread),
            "currentmodel" => Ok(Command::CurrentModel),
            _ => Err(CommandError::NotFound(name)),
        }
    }
}

fn split_args(body: &str) -> Result<Vec<String>, CommandError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_quotes = false;
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        match c {
            '\\' if in_quotes => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            '"' => {
                in_quotes = !in_quotes;
                in_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            c => {
                current.push(c);
                in_token = true;
            }
        }
    }

    if in_quotes {
        return Err(CommandError::UnclosedQuote);
    }
    if in_token {
        args.push(current);
    }

    Ok(args)
}
