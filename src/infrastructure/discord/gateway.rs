//! Discord 网关连接
//!
//! 维持一个 WebSocket 会话：Hello → Identify → 心跳，
//! 把关心的分发事件转成 [`GatewayEvent`] 送入通道。
//! 会话不做 resume，断开后由 [`DiscordGateway::run_supervised`] 重新 Identify。

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use crate::domain::{ChannelId, UserId};

/// 默认网关地址
pub const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg/?v=10&encoding=json";

/// GUILDS | GUILD_MESSAGES | MESSAGE_CONTENT
pub const DEFAULT_INTENTS: u64 = (1 << 0) | (1 << 9) | (1 << 15);

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

mod opcode {
    pub const DISPATCH: u8 = 0;
    pub const HEARTBEAT: u8 = 1;
    pub const IDENTIFY: u8 = 2;
    pub const RECONNECT: u8 = 7;
    pub const INVALID_SESSION: u8 = 9;
    pub const HELLO: u8 = 10;
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// 网关送出的事件
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    /// 会话就绪
    Ready { username: String },
    /// 发现线程（新建或公会快照中的活跃线程）
    ThreadsDiscovered(Vec<ChannelId>),
    /// 收到消息
    MessageCreate(MessageCreate),
}

/// `MESSAGE_CREATE` 中用到的字段
#[derive(Debug, Clone, Deserialize)]
pub struct MessageCreate {
    #[serde(deserialize_with = "super::snowflake::deserialize")]
    pub channel_id: ChannelId,
    pub author: Author,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    #[serde(deserialize_with = "super::snowflake::deserialize")]
    pub id: UserId,
    #[serde(default)]
    pub bot: bool,
}

#[derive(Debug, Deserialize)]
struct GatewayPayload {
    op: u8,
    #[serde(default)]
    d: Value,
    s: Option<u64>,
    t: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ThreadRef {
    #[serde(deserialize_with = "super::snowflake::deserialize")]
    id: ChannelId,
}

/// 会话正常结束的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// 事件接收端已关闭
    ReceiverClosed,
    /// 网关要求重连（opcode 7）
    Reconnect,
}

/// 重连退避，每次翻倍，上限 [`MAX_BACKOFF_SECS`]
#[derive(Debug)]
struct Backoff {
    secs: u64,
}

impl Backoff {
    fn new() -> Self {
        Self {
            secs: INITIAL_BACKOFF_SECS,
        }
    }

    fn reset(&mut self) {
        self.secs = INITIAL_BACKOFF_SECS;
    }

    fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_secs(self.secs);
        self.secs = self.secs.saturating_mul(2).min(MAX_BACKOFF_SECS);
        delay
    }
}

/// 重连也无法恢复的关闭（鉴权失败、意图不被允许等）
#[derive(Error, Debug)]
#[error("gateway closed with fatal code {code}: {reason}")]
pub struct FatalClose {
    pub code: u16,
    pub reason: String,
}

fn is_fatal_close(code: u16) -> bool {
    matches!(code, 4004 | 4010 | 4011 | 4012 | 4013 | 4014)
}

/// Discord 网关客户端
pub struct DiscordGateway {
    url: String,
    token: String,
    intents: u64,
}

impl DiscordGateway {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_GATEWAY_URL.to_string(),
            token: token.into(),
            intents: DEFAULT_INTENTS,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn identify_payload(&self) -> Value {
        json!({
            "op": opcode::IDENTIFY,
            "d": {
                "token": self.token,
                "intents": self.intents,
                "properties": {
                    "os": std::env::consts::OS,
                    "browser": env!("CARGO_PKG_NAME"),
                    "device": env!("CARGO_PKG_NAME"),
                }
            }
        })
    }

    /// 持续运行网关，异常断开后按指数退避重连
    ///
    /// 会话到达 READY 后退避归零；网关主动要求重连时立即重连。
    /// 接收端关闭时正常返回；遇到不可恢复的关闭码时返回错误。
    pub async fn run_supervised(&self, tx: mpsc::Sender<GatewayEvent>) -> Result<()> {
        let mut backoff = Backoff::new();

        loop {
            let mut ready = false;
            let result = self.session(tx.clone(), &mut ready).await;

            if tx.is_closed() {
                return Ok(());
            }
            if ready {
                backoff.reset();
            }

            match result {
                Ok(SessionEnd::Reconnect) => {
                    info!("Gateway requested reconnect");
                    continue;
                }
                Ok(SessionEnd::ReceiverClosed) => {
                    warn!("Gateway session exited unexpectedly; restarting")
                }
                Err(err) => {
                    if let Some(fatal) = err.downcast_ref::<FatalClose>() {
                        error!("Gateway cannot recover: {}", fatal);
                        return Err(err);
                    }
                    error!("Gateway error: {:#}; restarting", err);
                }
            }

            tokio::time::sleep(backoff.next_delay()).await;
        }
    }

    /// 运行一个网关会话直到断开
    pub async fn run(&self, tx: mpsc::Sender<GatewayEvent>) -> Result<SessionEnd> {
        let mut ready = false;
        self.session(tx, &mut ready).await
    }

    async fn session(
        &self,
        tx: mpsc::Sender<GatewayEvent>,
        ready: &mut bool,
    ) -> Result<SessionEnd> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .context("failed to connect to Discord gateway")?;
        let (mut write, mut read) = ws_stream.split();

        let hello = match read.next().await {
            Some(frame) => parse_frame(frame?)?,
            None => bail!("gateway closed before Hello"),
        };
        let hello = hello.ok_or_else(|| anyhow!("gateway sent non-text Hello"))?;
        let interval = heartbeat_interval(&hello)?;
        debug!("Gateway heartbeat interval {:?}", interval);

        write
            .send(WsMessage::Text(self.identify_payload().to_string()))
            .await
            .context("failed to send Identify")?;

        // 首次心跳加随机抖动
        let first = interval.mul_f64(rand::random::<f64>());
        let mut heartbeat = interval_at(Instant::now() + first, interval);
        let mut sequence: Option<u64> = None;
        let mut awaiting_ack = false;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if awaiting_ack {
                        bail!("heartbeat not acknowledged");
                    }
                    write
                        .send(heartbeat_frame(sequence))
                        .await
                        .context("failed to send heartbeat")?;
                    awaiting_ack = true;
                }
                frame = read.next() => {
                    let frame = match frame {
                        Some(frame) => frame?,
                        None => bail!("gateway stream ended"),
                    };

                    if let WsMessage::Close(close) = &frame {
                        if let Some(close) = close {
                            let code = u16::from(close.code);
                            if is_fatal_close(code) {
                                return Err(FatalClose {
                                    code,
                                    reason: close.reason.to_string(),
                                }
                                .into());
                            }
                        }
                        bail!("gateway closed: {:?}", close);
                    }

                    let Some(payload) = parse_frame(frame)? else {
                        continue;
                    };
                    if let Some(s) = payload.s {
                        sequence = Some(s);
                    }

                    match payload.op {
                        opcode::DISPATCH => {
                            if payload.t.as_deref() == Some("READY") {
                                *ready = true;
                            }
                            if !forward_dispatch(payload, &tx).await {
                                return Ok(SessionEnd::ReceiverClosed);
                            }
                        }
                        opcode::HEARTBEAT => {
                            write
                                .send(heartbeat_frame(sequence))
                                .await
                                .context("failed to send heartbeat")?;
                        }
                        opcode::HEARTBEAT_ACK => awaiting_ack = false,
                        opcode::RECONNECT => return Ok(SessionEnd::Reconnect),
                        opcode::INVALID_SESSION => bail!("gateway invalidated the session"),
                        op => debug!("Ignoring gateway opcode {}", op),
                    }
                }
            }
        }
    }
}

/// 从 Hello 中取出心跳间隔
fn heartbeat_interval(hello: &GatewayPayload) -> Result<Duration> {
    if hello.op != opcode::HELLO {
        bail!("expected Hello, got opcode {}", hello.op);
    }
    let interval_ms = hello.d["heartbeat_interval"]
        .as_u64()
        .ok_or_else(|| anyhow!("Hello without heartbeat_interval"))?;
    if interval_ms == 0 {
        bail!("Hello with zero heartbeat_interval");
    }
    Ok(Duration::from_millis(interval_ms))
}

fn heartbeat_frame(sequence: Option<u64>) -> WsMessage {
    WsMessage::Text(json!({ "op": opcode::HEARTBEAT, "d": sequence }).to_string())
}

fn parse_frame(frame: WsMessage) -> Result<Option<GatewayPayload>> {
    match frame {
        WsMessage::Text(text) => {
            let payload = serde_json::from_str(&text).context("malformed gateway payload")?;
            Ok(Some(payload))
        }
        _ => Ok(None),
    }
}

/// 把分发事件转成 [`GatewayEvent`]
fn decode_dispatch(payload: GatewayPayload) -> Option<GatewayEvent> {
    let name = payload.t?;
    let parsed = match name.as_str() {
        "READY" => payload.d["user"]["username"]
            .as_str()
            .map(|username| GatewayEvent::Ready {
                username: username.to_string(),
            })
            .ok_or_else(|| anyhow!("READY without user")),
        "MESSAGE_CREATE" => serde_json::from_value::<MessageCreate>(payload.d)
            .map(GatewayEvent::MessageCreate)
            .map_err(Into::into),
        "THREAD_CREATE" => serde_json::from_value::<ThreadRef>(payload.d)
            .map(|thread| GatewayEvent::ThreadsDiscovered(vec![thread.id]))
            .map_err(Into::into),
        "GUILD_CREATE" => {
            let threads = payload.d.get("threads").cloned().unwrap_or(Value::Null);
            serde_json::from_value::<Option<Vec<ThreadRef>>>(threads)
                .map(|threads| {
                    GatewayEvent::ThreadsDiscovered(
                        threads.unwrap_or_default().into_iter().map(|t| t.id).collect(),
                    )
                })
                .map_err(Into::into)
        }
        _ => return None,
    };

    match parsed {
        Ok(event) => Some(event),
        Err(err) => {
            warn!("Dropping malformed {} event: {:#}", name, err);
            None
        }
    }
}

/// 转发事件；接收端已关闭时返回 false
async fn forward_dispatch(payload: GatewayPayload, tx: &mpsc::Sender<GatewayEvent>) -> bool {
    let Some(event) = decode_dispatch(payload) else {
        return true;
    };
    if let GatewayEvent::Ready { username } = &event {
        info!("Gateway session ready as {}", username);
    }
    tx.send(event).await.is_ok()
}
