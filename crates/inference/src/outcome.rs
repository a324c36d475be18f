use {
    parley_config::GenerationConfig,
    serde::{Deserialize, Serialize},
};

/// Sampling parameters sent alongside the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_new_tokens: 100,
            temperature: 0.7,
        }
    }
}

impl From<&GenerationConfig> for GenerationParams {
    fn from(cfg: &GenerationConfig) -> Self {
        Self {
            max_new_tokens: cfg.max_new_tokens,
            temperature: cfg.temperature,
        }
    }
}

/// A single inference call: the prompt plus generation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    /// Raw user text or an assembled transcript ending in the assistant cue.
    pub inputs: String,
    pub params: GenerationParams,
}

impl InferenceRequest {
    pub fn new(inputs: impl Into<String>) -> Self {
        Self {
            inputs: inputs.into(),
            params: GenerationParams::default(),
        }
    }

    #[must_use]
    pub fn with_params(mut self, params: GenerationParams) -> Self {
        self.params = params;
        self
    }
}

/// Result of asking a backend (or a chain of them) for a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InferenceOutcome {
    /// Generated text, non-empty after trimming.
    Success(String),
    /// Transient unavailability, typically a model still loading. Worth retrying
    /// the same backend after a pause.
    Retryable(String),
    /// The backend answered but the body could not be used (unknown shape,
    /// empty text). Retrying the same backend will not help.
    Unusable(String),
    /// Transport, auth, or non-2xx failure.
    Fatal(String),
}

impl InferenceOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_))
    }

    /// Short tag used in structured logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Success(_) => "success",
            Self::Retryable(_) => "retryable",
            Self::Unusable(_) => "unusable",
            Self::Fatal(_) => "fatal",
        }
    }

    /// Generated text on success, failure reason otherwise.
    #[must_use]
    pub fn detail(&self) -> &str {
        match self {
            Self::Success(text)
            | Self::Retryable(text)
            | Self::Unusable(text)
            | Self::Fatal(text) => text,
        }
    }
}
