use std::{sync::Arc, time::Duration};

use {
    parley_common::ChatKey,
    parley_config::{ChatMessages, ParleyConfig},
    parley_inference::{GenerationParams, InferenceBackend, InferenceOutcome, InferenceRequest},
    parley_sessions::{ConversationMemory, Turn},
    tracing::{debug, info, warn},
};

use crate::prompt::{TranscriptMarkers, build_transcript, extract_continuation, is_reset_command};

/// Behaviour knobs for [`ChatOrchestrator`], usually built from [`ParleyConfig`].
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub max_input_chars: usize,
    pub reset_commands: Vec<String>,
    pub markers: TranscriptMarkers,
    /// When false, history is neither read nor written and the raw text is sent.
    pub memory_enabled: bool,
    pub params: GenerationParams,
    pub messages: ChatMessages,
}

impl ChatSettings {
    #[must_use]
    pub fn from_config(config: &ParleyConfig) -> Self {
        Self {
            max_input_chars: config.chat.max_input_chars,
            reset_commands: config.chat.reset_commands.clone(),
            markers: TranscriptMarkers {
                user: config.chat.user_marker.clone(),
                assistant: config.chat.assistant_cue.clone(),
            },
            memory_enabled: config.memory.enabled,
            params: GenerationParams::from(&config.generation),
            messages: config.chat.messages.clone(),
        }
    }
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self::from_config(&ParleyConfig::default())
    }
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    /// Empty message (or media without caption).
    TextOnly,
    TooLong,
    Reset,
    /// Model answer, possibly replaced by the greeting when it came back empty.
    Generated,
    /// Every backend was still warming up.
    Busy,
    /// No backend could produce a usable answer.
    Unavailable,
}

impl ReplyKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TextOnly => "text_only",
            Self::TooLong => "too_long",
            Self::Reset => "reset",
            Self::Generated => "generated",
            Self::Busy => "busy",
            Self::Unavailable => "unavailable",
        }
    }
}

/// Text to send back plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub kind: ReplyKind,
}

impl Reply {
    fn new(kind: ReplyKind, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind,
        }
    }
}

/// Public entry point of the core: one chat message in, one reply out.
///
/// Holds no per-request state, so concurrent calls for different chats
/// proceed independently; the only shared state is the memory store.
pub struct ChatOrchestrator {
    backend: Arc<dyn InferenceBackend>,
    memory: Arc<ConversationMemory>,
    settings: ChatSettings,
}

impl ChatOrchestrator {
    pub fn new(
        backend: Arc<dyn InferenceBackend>,
        memory: Arc<ConversationMemory>,
        settings: ChatSettings,
    ) -> Self {
        Self {
            backend,
            memory,
            settings,
        }
    }

    #[must_use]
    pub fn memory(&self) -> &Arc<ConversationMemory> {
        &self.memory
    }

    /// Produce the reply text for `user_text`. Never fails.
    pub async fn reply(&self, chat: &ChatKey, user_text: &str) -> String {
        self.respond(chat, user_text).await.text
    }

    /// [`respond`](Self::respond) bounded by `deadline`.
    ///
    /// When the deadline passes first, the pending backend call is dropped and
    /// the unavailable message is returned, so the caller always has a reply
    /// to deliver. `None` waits for the fallback chain to finish.
    pub async fn respond_within(
        &self,
        chat: &ChatKey,
        user_text: &str,
        deadline: Option<Duration>,
    ) -> Reply {
        let Some(deadline) = deadline else {
            return self.respond(chat, user_text).await;
        };
        match tokio::time::timeout(deadline, self.respond(chat, user_text)).await {
            Ok(reply) => reply,
            Err(_) => {
                warn!(
                    %chat,
                    deadline_secs = deadline.as_secs(),
                    "reply deadline passed before inference finished"
                );
                Reply::new(ReplyKind::Unavailable, &self.settings.messages.unavailable)
            },
        }
    }

    /// Same as [`reply`](Self::reply), also reporting which path produced it.
    pub async fn respond(&self, chat: &ChatKey, user_text: &str) -> Reply {
        let messages = &self.settings.messages;
        let text = user_text.trim();

        if text.is_empty() {
            debug!(%chat, "empty message, asking for text");
            return Reply::new(ReplyKind::TextOnly, &messages.text_only);
        }

        let chars = user_text.chars().count();
        if chars > self.settings.max_input_chars {
            debug!(%chat, chars, max = self.settings.max_input_chars, "message too long");
            let reply = messages
                .too_long
                .replace("{max_chars}", &self.settings.max_input_chars.to_string());
            return Reply::new(ReplyKind::TooLong, reply);
        }

        if is_reset_command(text, &self.settings.reset_commands) {
            self.memory.reset(chat);
            info!(%chat, "conversation reset");
            return Reply::new(ReplyKind::Reset, &messages.reset_ack);
        }

        let inputs = if self.settings.memory_enabled {
            let history = self.memory.history(chat);
            self.memory.append(chat, Turn::user(text));
            build_transcript(&history, text, &self.settings.markers)
        } else {
            text.to_string()
        };
        let request = InferenceRequest::new(inputs).with_params(self.settings.params);

        match self.backend.invoke(&request).await {
            InferenceOutcome::Success(generated) => {
                let continuation =
                    extract_continuation(&generated, &self.settings.markers.assistant);
                let reply = if continuation.is_empty() {
                    debug!(%chat, "model returned nothing new, sending greeting");
                    messages.greeting.clone()
                } else {
                    continuation.to_string()
                };
                if self.settings.memory_enabled {
                    self.memory.append(chat, Turn::assistant(&reply));
                }
                info!(%chat, reply_chars = reply.chars().count(), "reply generated");
                Reply::new(ReplyKind::Generated, reply)
            },
            InferenceOutcome::Retryable(reason) => {
                warn!(%chat, %reason, "all backends still warming up");
                Reply::new(ReplyKind::Busy, &messages.busy)
            },
            outcome @ (InferenceOutcome::Unusable(_) | InferenceOutcome::Fatal(_)) => {
                warn!(
                    %chat,
                    outcome = outcome.kind(),
                    reason = outcome.detail(),
                    "no backend produced a reply"
                );
                Reply::new(ReplyKind::Unavailable, &messages.unavailable)
            },
        }
    }
}
