use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use {
    parley_chat::{ChatOrchestrator, ChatSettings},
    parley_config::ParleyConfig,
    parley_inference::FallbackChain,
    parley_sessions::ConversationMemory,
    parley_telegram::{ReplyRelay, TelegramOutbound},
    tracing::info,
};

/// Everything a request handler needs. Cheap to clone.
#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub relay: Arc<dyn ReplyRelay>,
    /// Backend ids in fallback order, reported by `/health`.
    pub backend_ids: Arc<[String]>,
    /// Bound on producing a reply, leaving room to deliver it before the
    /// request timeout. `None` waits for the fallback chain.
    pub reply_deadline: Option<Duration>,
    pub started_at: Instant,
    pub version: &'static str,
}

impl GatewayState {
    pub fn new(
        orchestrator: Arc<ChatOrchestrator>,
        relay: Arc<dyn ReplyRelay>,
        backend_ids: Vec<String>,
    ) -> Self {
        Self {
            orchestrator,
            relay,
            backend_ids: backend_ids.into(),
            reply_deadline: None,
            started_at: Instant::now(),
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    /// Wire up the full pipeline from config.
    pub fn from_config(config: &ParleyConfig) -> anyhow::Result<Self> {
        let orchestrator = build_orchestrator(config)?;
        let relay = TelegramOutbound::from_config(&config.telegram)?;
        let backend_ids = config.backends.iter().map(|b| b.id.clone()).collect();
        Ok(Self::new(Arc::new(orchestrator), Arc::new(relay), backend_ids)
            .with_reply_deadline(config.reply_deadline()))
    }

    #[must_use]
    pub fn with_reply_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.reply_deadline = deadline;
        self
    }

    #[must_use]
    pub fn memory(&self) -> &Arc<ConversationMemory> {
        self.orchestrator.memory()
    }
}

/// Build the orchestrator with an HTTP fallback chain and a fresh memory store.
pub fn build_orchestrator(config: &ParleyConfig) -> anyhow::Result<ChatOrchestrator> {
    let chain = FallbackChain::from_config(config)?;
    info!(
        backends = ?chain.backend_ids(),
        max_attempts = chain.retry_policy().max_attempts,
        delay_secs = chain.retry_policy().delay.as_secs(),
        memory = config.memory.enabled,
        max_turns = config.memory.max_turns,
        "inference pipeline ready"
    );
    let memory = Arc::new(ConversationMemory::new(config.memory.max_turns));
    Ok(ChatOrchestrator::new(
        Arc::new(chain),
        memory,
        ChatSettings::from_config(config),
    ))
}
