use anyhow::Result;
use clap::Parser;
use thread_relay::bootstrap::RelayLauncher;
use thread_relay::config::AppConfig;
use thread_relay::infrastructure::logger;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    logger::init();

    let cfg = AppConfig::parse();
    RelayLauncher::new(cfg).launch().await
}
