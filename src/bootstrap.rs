//! # Relay Bootstrap Module
//!
//! Wires the registry, store, dispatcher and router to Discord and runs the
//! gateway until Ctrl-C.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::application::{EventRouter, RouterSettings};
use crate::config::AppConfig;
use crate::core::dispatcher::Dispatcher;
use crate::core::registry::ModelRegistry;
use crate::core::thread_store::ThreadStore;
use crate::infrastructure::anthropic::AnthropicClient;
use crate::infrastructure::discord::{DiscordGateway, DiscordPlatform, DiscordRest, GatewayEvent};
use crate::infrastructure::llm::OpenAIClient;

const EVENT_QUEUE_SIZE: usize = 256;

/// Relay launcher
pub struct RelayLauncher {
    config: AppConfig,
}

impl RelayLauncher {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Build the dispatcher from configured provider clients
    pub fn build_dispatcher(&self) -> Dispatcher {
        let anthropic = AnthropicClient::new_with_base_url(
            self.config.anthropic_key.clone(),
            self.config.anthropic_base_url.clone(),
        );
        let openai = OpenAIClient::new_with_base_url(
            self.config.openai_key.clone(),
            self.config.openai_base_url.clone(),
        );

        Dispatcher::new(Arc::new(anthropic), Arc::new(openai))
            .with_max_output_units(self.config.max_output_units)
    }

    /// Validate configuration, connect and serve until shutdown
    pub async fn launch(&self) -> Result<()> {
        self.config.validate()?;
        info!("🚀 Launching thread relay with {:?}", self.config);

        let rest = DiscordRest::new_with_base_url(
            self.config.discord_token.clone(),
            self.config.discord_api_url.clone(),
        );
        let bot = rest
            .current_user()
            .await
            .context("failed to resolve bot identity")?;

        let platform = Arc::new(DiscordPlatform::new(rest));
        let settings = RouterSettings::new(bot.id)
            .with_command_prefix(self.config.command_prefix.clone())
            .with_serialize_threads(self.config.serialize_threads);
        let router = Arc::new(EventRouter::new(
            settings,
            Arc::new(ModelRegistry::builtin()),
            Arc::new(ThreadStore::with_history_limit(self.config.history_limit)),
            self.build_dispatcher(),
            platform.clone(),
        ));

        let (tx, rx) = mpsc::channel(EVENT_QUEUE_SIZE);
        let gateway = DiscordGateway::new(self.config.discord_token.clone());

        tokio::select! {
            result = gateway.run_supervised(tx) => {
                result.context("Discord gateway stopped")?;
            }
            _ = serve(rx, router, platform) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
            }
        }

        Ok(())
    }
}

/// Hand each inbound event to its own task
async fn serve(
    mut rx: mpsc::Receiver<GatewayEvent>,
    router: Arc<EventRouter>,
    platform: Arc<DiscordPlatform>,
) {
    while let Some(event) = rx.recv().await {
        match event {
            GatewayEvent::Ready { username } => {
                info!("{} has connected to Discord!", username);
            }
            GatewayEvent::ThreadsDiscovered(threads) => platform.remember_threads(threads),
            GatewayEvent::MessageCreate(message) => {
                let router = router.clone();
                let platform = platform.clone();
                tokio::spawn(async move {
                    let inbound = platform.inbound(message).await;
                    router.handle(inbound).await;
                });
            }
        }
    }

    error!("Gateway event channel closed");
}
