use anyhow::{Context, Result};
use chrono::Utc;
use common::WatcherConfig;
use telegram::TelegramSink;
use tracing::info;

use watcher::{logging, Notifier, Phase, PollState, Poller, PracticumClient, TokioSleeper};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config = WatcherConfig::from_env().context("Invalid configuration")?;
    logging::init(&config.logging)?;

    info!("📚 Homework watcher v{}", env!("CARGO_PKG_VERSION"));

    // ── Startup gate ────────────────────────────────────────────────
    if Phase::after_startup(&config) == Phase::Terminated {
        anyhow::bail!("Required environment variables are missing, see the log");
    }
    let credentials = config.credentials()?;

    // ── Collaborators ───────────────────────────────────────────────
    let source = PracticumClient::new(
        &config.endpoint,
        &credentials.practicum_token,
        config.request_timeout,
    )
    .context("Failed to build HTTP client")?;

    let mut sink = TelegramSink::new(&credentials.telegram_token, &credentials.telegram_chat_id);
    if let Some(api_url) = &config.telegram_api_url {
        sink = sink
            .with_api_url(api_url)
            .map_err(|e| anyhow::anyhow!("Invalid TELEGRAM_API_URL: {}", e))?;
    }

    let started = Utc::now();
    info!(
        endpoint = %config.endpoint,
        chat_id = %credentials.telegram_chat_id,
        from = %started.to_rfc3339(),
        "Watching homework statuses"
    );

    let poller = Poller::new(
        Box::new(source),
        Notifier::new(Box::new(sink)),
        Box::new(TokioSleeper),
        config.retry_period,
        PollState::new(started.timestamp()),
    );
    poller.run().await;

    Ok(())
}
