//! Discord REST 客户端
//!
//! 只覆盖中继用到的几个端点

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{ChannelId, ChannelKind, UserId};
use crate::errors::{PlatformError, PlatformResult};

/// 默认 API 地址
pub const DEFAULT_DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// 公开线程
const PUBLIC_THREAD: u8 = 11;

/// 线程类型：公告线程、公开线程、私密线程
pub fn is_thread_type(kind: u8) -> bool {
    matches!(kind, 10..=12)
}

/// `GET /users/@me` 返回的机器人身份
#[derive(Debug, Clone, Deserialize)]
pub struct CurrentUser {
    #[serde(deserialize_with = "super::snowflake::deserialize")]
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Deserialize)]
struct ChannelObject {
    #[serde(deserialize_with = "super::snowflake::deserialize")]
    id: ChannelId,
    #[serde(rename = "type")]
    kind: u8,
}

#[derive(Debug, Clone)]
pub struct DiscordRest {
    http: reqwest::Client,
    token: String,
    base_url: String,
}

impl DiscordRest {
    pub fn new(token: impl Into<String>) -> Self {
        Self::new_with_base_url(token, DEFAULT_DISCORD_API_URL)
    }

    pub fn new_with_base_url(token: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> PlatformResult<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Discord {} {}", method, path);

        let mut request = self
            .http
            .request(method, &url)
            .header(AUTHORIZATION, format!("Bot {}", self.token))
            .header(CONTENT_TYPE, "application/json");
        request = match body {
            Some(body) => request.json(&body),
            // Discord 要求无 body 的 POST 也带 Content-Length
            None => request.body(""),
        };

        let res = request
            .send()
            .await
            .map_err(|err| PlatformError::Request(err.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|err| PlatformError::Request(err.to_string()))?;

        if status == StatusCode::FORBIDDEN {
            return Err(PlatformError::Forbidden(text));
        }
        if !status.is_success() {
            return Err(PlatformError::Request(format!(
                "{} (status code: {})",
                text,
                status.as_u16()
            )));
        }

        let text = if text.is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|err| PlatformError::Request(err.to_string()))
    }

    /// 机器人自己的身份
    pub async fn current_user(&self) -> PlatformResult<CurrentUser> {
        self.request(Method::GET, "/users/@me", None).await
    }

    /// 查询频道类型
    pub async fn channel_kind(&self, channel: ChannelId) -> PlatformResult<ChannelKind> {
        let channel: ChannelObject = self
            .request(Method::GET, &format!("/channels/{}", channel), None)
            .await?;
        debug!("Channel {} has type {}", channel.id, channel.kind);

        Ok(if is_thread_type(channel.kind) {
            ChannelKind::Thread
        } else {
            ChannelKind::Other
        })
    }

    pub async fn send_message(&self, channel: ChannelId, content: &str) -> PlatformResult<()> {
        let _: Value = self
            .request(
                Method::POST,
                &format!("/channels/{}/messages", channel),
                Some(json!({ "content": content })),
            )
            .await?;
        Ok(())
    }

    /// 在父频道下创建公开线程
    pub async fn create_thread(&self, parent: ChannelId, name: &str) -> PlatformResult<ChannelId> {
        let channel: ChannelObject = self
            .request(
                Method::POST,
                &format!("/channels/{}/threads", parent),
                Some(json!({ "name": name, "type": PUBLIC_THREAD })),
            )
            .await?;
        Ok(channel.id)
    }

    pub async fn archive_thread(&self, thread: ChannelId) -> PlatformResult<()> {
        let _: Value = self
            .request(
                Method::PATCH,
                &format!("/channels/{}", thread),
                Some(json!({ "archived": true })),
            )
            .await?;
        Ok(())
    }

    pub async fn trigger_typing(&self, channel: ChannelId) -> PlatformResult<()> {
        let _: Value = self
            .request(Method::POST, &format!("/channels/{}/typing", channel), None)
            .await?;
        Ok(())
    }
}
