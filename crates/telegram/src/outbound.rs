use {
    async_trait::async_trait,
    parley_common::ChatKey,
    parley_config::TelegramConfig,
    secrecy::ExposeSecret,
    teloxide::{
        prelude::*,
        types::{ChatId, Recipient},
    },
    tracing::{debug, info},
};

use crate::error::{Error, Result};

/// Bot API limit for a single `sendMessage` text.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Delivers reply text back to a chat.
#[async_trait]
pub trait ReplyRelay: Send + Sync {
    async fn send_text(&self, chat: &ChatKey, text: &str) -> Result<()>;
}

/// Relay backed by the Telegram Bot API.
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Build a bot client from config: token, send timeout and an optional
    /// Bot API base URL.
    pub fn from_config(config: &TelegramConfig) -> Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(config.send_timeout())
            .build()
            .map_err(|e| Error::message(format!("telegram client: {e}")))?;
        let mut bot = Bot::with_client(config.token.expose_secret(), client);
        if let Some(api_url) = config.api_url.as_deref() {
            let api = url::Url::parse(api_url)
                .map_err(|e| Error::message(format!("invalid telegram api_url {api_url}: {e}")))?;
            bot = bot.set_api_url(api);
        }
        debug!(
            send_timeout_secs = config.send_timeout().as_secs(),
            custom_api = config.api_url.is_some(),
            "telegram relay ready"
        );
        Ok(Self::new(bot))
    }
}

#[async_trait]
impl ReplyRelay for TelegramOutbound {
    async fn send_text(&self, chat: &ChatKey, text: &str) -> Result<()> {
        let chunks = chunk_text(text, TELEGRAM_MAX_MESSAGE_LEN);
        for chunk in &chunks {
            self.bot.send_message(recipient(chat), *chunk).await?;
        }
        info!(
            %chat,
            text_chars = text.chars().count(),
            chunk_count = chunks.len(),
            "telegram reply sent"
        );
        Ok(())
    }
}

/// Integer keys are chat ids; anything else is treated as a `@username`.
fn recipient(chat: &ChatKey) -> Recipient {
    match chat.as_i64() {
        Some(id) => Recipient::Id(ChatId(id)),
        None => Recipient::ChannelUsername(chat.as_str().to_string()),
    }
}

/// Split `text` into pieces of at most `max_chars` characters, preferring to
/// break after a newline. Empty input yields one empty chunk.
fn chunk_text(text: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while rest.chars().count() > max_chars {
        let hard_end = rest
            .char_indices()
            .nth(max_chars)
            .map_or(rest.len(), |(idx, _)| idx);
        let end = match rest[..hard_end].rfind('\n') {
            Some(idx) if idx > 0 => idx + 1,
            _ => hard_end,
        };
        chunks.push(&rest[..end]);
        rest = &rest[end..];
    }
    chunks.push(rest);
    chunks
}
