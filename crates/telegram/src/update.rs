//! Webhook payload parsing.
//!
//! Only the handful of fields the bot reads are modelled. Everything else in
//! a Telegram `Update` is ignored, so new Bot API fields never break parsing.

use {parley_common::ChatKey, serde::Deserialize};

/// Subset of a Telegram `Update` relevant to text chat.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Update {
    #[serde(default)]
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<IncomingMessage>,
    #[serde(default)]
    pub edited_message: Option<IncomingMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    pub chat: IncomingChat,
    #[serde(default)]
    pub text: Option<String>,
    /// Present on photos, documents and other media.
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncomingChat {
    pub id: RawChatId,
}

/// Telegram sends integers; some self-hosted Bot API servers and test
/// harnesses send strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RawChatId {
    Int(i64),
    Str(String),
}

impl From<&RawChatId> for ChatKey {
    fn from(id: &RawChatId) -> Self {
        match id {
            RawChatId::Int(id) => ChatKey::from(*id),
            RawChatId::Str(id) => ChatKey::from(id.as_str()),
        }
    }
}

/// A message the orchestrator should answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    pub chat: ChatKey,
    /// Message text, caption, or empty for media without one.
    pub text: String,
}

impl Update {
    /// The message carried by this update: `message`, else `edited_message`.
    #[must_use]
    pub fn incoming(&self) -> Option<&IncomingMessage> {
        self.message.as_ref().or(self.edited_message.as_ref())
    }

    /// Extract `(chat, text)`, or `None` for updates without a message
    /// (callback queries, member changes, ...).
    #[must_use]
    pub fn inbound(&self) -> Option<Inbound> {
        self.incoming().map(|msg| Inbound {
            chat: ChatKey::from(&msg.chat.id),
            text: msg.text().to_string(),
        })
    }
}

impl IncomingMessage {
    /// Text, falling back to the media caption.
    #[must_use]
    pub fn text(&self) -> &str {
        self.text
            .as_deref()
            .or(self.caption.as_deref())
            .unwrap_or_default()
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, serde_json::json};

    fn parse(value: serde_json::Value) -> Update {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn plain_text_message() {
        let update = parse(json!({
            "update_id": 1,
            "message": {
                "message_id": 10,
                "date": 0,
                "chat": {"id": 42, "type": "private"},
                "from": {"id": 42, "is_bot": false, "first_name": "Ada"},
                "text": "Hello"
            }
        }));

        assert_eq!(
            update.inbound(),
            Some(Inbound {
                chat: ChatKey::from(42_i64),
                text: "Hello".into(),
            })
        );
    }

    #[rstest]
    #[case(json!({"chat": {"id": 1}, "caption": "look"}), "look")]
    #[case(json!({"chat": {"id": 1}, "text": "t", "caption": "c"}), "t")]
    #[case(json!({"chat": {"id": 1}, "photo": [{"file_id": "x"}]}), "")]
    fn text_falls_back_to_caption(#[case] message: serde_json::Value, #[case] expected: &str) {
        let update = parse(json!({"update_id": 1, "message": message}));
        assert_eq!(update.inbound().unwrap().text, expected);
    }

    #[test]
    fn edited_message_is_used_when_message_missing() {
        let update = parse(json!({
            "update_id": 2,
            "edited_message": {"chat": {"id": -100}, "text": "fixed typo"}
        }));

        let inbound = update.inbound().unwrap();
        assert_eq!(inbound.chat, ChatKey::from(-100_i64));
        assert_eq!(inbound.text, "fixed typo");
    }

    #[test]
    fn message_wins_over_edited_message() {
        let update = parse(json!({
            "message": {"chat": {"id": 1}, "text": "new"},
            "edited_message": {"chat": {"id": 1}, "text": "edited"}
        }));
        assert_eq!(update.inbound().unwrap().text, "new");
    }

    #[test]
    fn updates_without_message_yield_nothing() {
        let update = parse(json!({
            "update_id": 3,
            "callback_query": {"id": "abc", "data": "x"}
        }));
        assert!(update.inbound().is_none());
    }

    #[test]
    fn string_chat_ids_are_accepted() {
        let update = parse(json!({"message": {"chat": {"id": "@channel"}, "text": "hi"}}));
        assert_eq!(update.inbound().unwrap().chat, ChatKey::from("@channel"));
    }
}
