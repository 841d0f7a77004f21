use async_trait::async_trait;
use common::sink::{MessageSink, SinkError};
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{debug, info, warn};

/// Telegram `sendMessage` text limit (characters).
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4096;

/// Delivers notifications to one fixed chat through the Bot API.
pub struct TelegramSink {
    bot: Bot,
    recipient: Recipient,
}

impl TelegramSink {
    pub fn new(token: &str, chat_id: &str) -> Self {
        Self {
            bot: Bot::new(token),
            recipient: parse_recipient(chat_id),
        }
    }

    /// Talk to a self-hosted Bot API server instead of the official one.
    pub fn with_api_url(mut self, api_url: &str) -> Result<Self, SinkError> {
        let url = url::Url::parse(api_url)?;
        info!(api_url = %url, "Using custom Telegram Bot API server");
        self.bot = self.bot.set_api_url(url);
        Ok(self)
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    fn channel_type(&self) -> &'static str {
        "telegram"
    }

    async fn send_text(&self, text: &str) -> Result<(), SinkError> {
        let text = truncate_message(text, TELEGRAM_MESSAGE_LIMIT);
        match self.bot.send_message(self.recipient.clone(), text).await {
            Ok(msg) => {
                debug!(message_id = msg.id.0, "Telegram message sent");
                Ok(())
            }
            Err(e) => {
                warn!("Telegram sendMessage failed: {}", e);
                Err(e.into())
            }
        }
    }
}

/// Numeric ids address users and groups, anything else a public
/// channel (`@name`).
fn parse_recipient(chat_id: &str) -> Recipient {
    let chat_id = chat_id.trim();
    match chat_id.parse::<i64>() {
        Ok(id) => Recipient::Id(ChatId(id)),
        Err(_) => Recipient::ChannelUsername(chat_id.to_string()),
    }
}

fn truncate_message(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(limit.saturating_sub(1)).collect();
    truncated.push('…');
    truncated
}
