//! Telegram edge of parley.
//!
//! [`update`] turns webhook payloads into `(chat, text)` pairs and
//! [`outbound`] delivers replies through the Bot API using teloxide.

pub mod error;
pub mod outbound;
pub mod update;

pub use {
    error::{Error, Result},
    outbound::{ReplyRelay, TELEGRAM_MAX_MESSAGE_LEN, TelegramOutbound},
    update::{Inbound, IncomingMessage, Update},
};
