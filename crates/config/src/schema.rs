/// Config schema types (server, telegram, backends, retry, memory, chat).
use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Public Hugging Face endpoint used when no backend is configured.
pub const DEFAULT_BACKEND_ENDPOINT: &str = "https://api-inference.huggingface.co/models/gpt2";

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub server: ServerConfig,
    pub telegram: TelegramConfig,
    /// Inference backends in fallback priority order (primary first).
    pub backends: Vec<BackendConfig>,
    pub generation: GenerationConfig,
    pub retry: RetryConfig,
    pub memory: MemoryConfig,
    pub chat: ChatConfig,
}

impl Default for ParleyConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            telegram: TelegramConfig::default(),
            backends: vec![BackendConfig::huggingface_gpt2()],
            generation: GenerationConfig::default(),
            retry: RetryConfig::default(),
            memory: MemoryConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl ParleyConfig {
    /// Longest the fallback chain can run: every backend times out on every
    /// attempt, with the retry delay between attempts.
    #[must_use]
    pub fn worst_case_inference_time(&self) -> Duration {
        let attempts = self.retry.max_attempts.max(1);
        self.backends
            .iter()
            .map(|b| b.timeout() * attempts + self.retry.delay() * (attempts - 1))
            .sum()
    }

    /// Time left for inference once delivery of the reply is budgeted for.
    ///
    /// `None` when the request timeout is disabled.
    #[must_use]
    pub fn reply_deadline(&self) -> Option<Duration> {
        self.server
            .request_timeout()
            .map(|t| t.saturating_sub(self.telegram.send_timeout()))
    }
}

/// Webhook server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind to. Defaults to "0.0.0.0".
    pub bind: String,
    /// Port to listen on. Defaults to 8000.
    pub port: u16,
    /// Upper bound on handling a single webhook delivery, inference included.
    /// 0 disables the timeout.
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_secs > 0).then(|| Duration::from_secs(self.request_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8000,
            request_timeout_secs: 240,
        }
    }
}

/// Telegram bot configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    #[serde(serialize_with = "serialize_redacted")]
    pub token: Secret<String>,
    /// Bot API base URL override (self-hosted Bot API server, tests).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
    /// Timeout for a single `sendMessage` call.
    pub send_timeout_secs: u64,
}

impl TelegramConfig {
    /// Whether a non-empty token is configured.
    #[must_use]
    pub fn has_token(&self) -> bool {
        !self.token.expose_secret().trim().is_empty()
    }

    #[must_use]
    pub fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.send_timeout_secs)
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("api_url", &self.api_url)
            .field("send_timeout_secs", &self.send_timeout_secs)
            .finish()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            api_url: None,
            send_timeout_secs: 30,
        }
    }
}

/// One inference endpoint in the fallback chain.
#[derive(Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Short name used in logs and the health endpoint (e.g. "gpt2").
    pub id: String,
    /// Full inference URL, e.g. `https://api-inference.huggingface.co/models/gpt2`.
    pub endpoint: String,
    /// Bearer token. The `Authorization` header is only sent when set.
    #[serde(
        default,
        serialize_with = "serialize_redacted_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub token: Option<Secret<String>>,
    #[serde(default = "default_backend_timeout_secs")]
    pub timeout_secs: u64,
    /// Send the `parameters` object (max_new_tokens, temperature) with each request.
    #[serde(default = "default_true")]
    pub send_parameters: bool,
}

impl BackendConfig {
    #[must_use]
    pub fn huggingface_gpt2() -> Self {
        Self {
            id: "gpt2".into(),
            endpoint: DEFAULT_BACKEND_ENDPOINT.into(),
            token: None,
            timeout_secs: default_backend_timeout_secs(),
            send_parameters: true,
        }
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl std::fmt::Debug for BackendConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendConfig")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .field("send_parameters", &self.send_parameters)
            .finish()
    }
}

/// Generation parameters sent with every inference request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.7,
        }
    }
}

/// Retry policy applied to each backend while it reports warm-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per backend, first attempt included.
    pub max_attempts: u32,
    /// Constant delay between attempts.
    pub delay_secs: u64,
}

impl RetryConfig {
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 5,
        }
    }
}

/// Short-term conversation memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// When disabled, every message is sent to the backend as raw text.
    pub enabled: bool,
    /// Maximum turns (user and assistant) kept per chat.
    pub max_turns: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_turns: 10,
        }
    }
}

/// Input handling and prompt formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Longest accepted message, in characters.
    pub max_input_chars: usize,
    /// Messages that clear the chat history (matched case-insensitively).
    pub reset_commands: Vec<String>,
    /// Role marker prefixed to user turns in the prompt transcript.
    pub user_marker: String,
    /// Role marker prefixed to assistant turns; also ends the prompt.
    pub assistant_cue: String,
    pub messages: ChatMessages,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 2000,
            reset_commands: vec!["/reset".into(), "reset".into(), "clear".into()],
            user_marker: "User:".into(),
            assistant_cue: "AI:".into(),
            messages: ChatMessages::default(),
        }
    }
}

/// Fixed replies sent without (or instead of) a model answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessages {
    pub text_only: String,
    /// `{max_chars}` is replaced with the configured limit.
    pub too_long: String,
    pub reset_ack: String,
    /// Sent when the model produced nothing after prompt extraction.
    pub greeting: String,
    /// Sent when every backend is still warming up.
    pub busy: String,
    /// Sent when no backend could be reached or none answered usefully.
    pub unavailable: String,
}

impl Default for ChatMessages {
    fn default() -> Self {
        Self {
            text_only: "Please send text only 🙂".into(),
            too_long: "That message is too long. Please keep it under {max_chars} characters."
                .into(),
            reset_ack: "Conversation cleared. Let's start fresh!".into(),
            greeting: "I'm here! How can I help you today?".into(),
            busy: "The AI model is waking up. Please try again in a few seconds.".into(),
            unavailable: "Temporary issue contacting the AI service. Please try again later."
                .into(),
        }
    }
}

fn default_backend_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn serialize_redacted<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    if secret.expose_secret().is_empty() {
        serializer.serialize_str("")
    } else {
        serializer.serialize_str("[REDACTED]")
    }
}

fn serialize_redacted_opt<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(secret) => serialize_redacted(secret, serializer),
        None => serializer.serialize_none(),
    }
}
