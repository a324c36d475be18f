//! Semantic configuration checks.
//!
//! Runs after parsing and env substitution, reporting problems that would
//! make the bot start but misbehave (no backends, leftover placeholders,
//! zero limits).

use std::collections::HashSet;

use secrecy::ExposeSecret;

use crate::{env_subst::has_placeholder, schema::ParleyConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "backends[1].endpoint"
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.path, self.message)
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    fn push(&mut self, severity: Severity, path: impl Into<String>, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a loaded configuration.
#[must_use]
pub fn validate(config: &ParleyConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    let token = config.telegram.token.expose_secret();
    if token.trim().is_empty() {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token is empty; set TELEGRAM_TOKEN or telegram.token",
        );
    } else if has_placeholder(token) {
        result.push(
            Severity::Error,
            "telegram.token",
            "bot token contains an unresolved ${...} placeholder",
        );
    }

    if let Some(ref api_url) = config.telegram.api_url
        && url::Url::parse(api_url).is_err()
    {
        result.push(
            Severity::Error,
            "telegram.api_url",
            format!("not a valid URL: {api_url}"),
        );
    }

    if config.backends.is_empty() {
        result.push(
            Severity::Error,
            "backends",
            "no inference backends configured; every message would get an apology",
        );
    }

    let mut seen = HashSet::new();
    for (i, backend) in config.backends.iter().enumerate() {
        let path = format!("backends[{i}]");
        if !seen.insert(backend.id.as_str()) {
            result.push(
                Severity::Warning,
                format!("{path}.id"),
                format!("duplicate backend id '{}'", backend.id),
            );
        }
        match url::Url::parse(&backend.endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {},
            Ok(url) => result.push(
                Severity::Error,
                format!("{path}.endpoint"),
                format!("unsupported scheme '{}'", url.scheme()),
            ),
            Err(e) => result.push(
                Severity::Error,
                format!("{path}.endpoint"),
                format!("invalid URL: {e}"),
            ),
        }
        if let Some(ref token) = backend.token {
            let token = token.expose_secret();
            if token.trim().is_empty() || has_placeholder(token) {
                result.push(
                    Severity::Warning,
                    format!("{path}.token"),
                    "token is empty or unresolved; requests will be sent without authorization",
                );
            }
        }
        if backend.timeout_secs == 0 {
            result.push(
                Severity::Error,
                format!("{path}.timeout_secs"),
                "timeout must be greater than zero",
            );
        }
    }

    if config.retry.max_attempts == 0 {
        result.push(
            Severity::Warning,
            "retry.max_attempts",
            "0 attempts is treated as 1",
        );
    }

    if config.memory.enabled && config.memory.max_turns == 0 {
        result.push(
            Severity::Warning,
            "memory.max_turns",
            "memory is enabled but keeps no turns",
        );
    }

    if config.chat.max_input_chars == 0 {
        result.push(
            Severity::Error,
            "chat.max_input_chars",
            "every message would be rejected as too long",
        );
    }

    if config.chat.assistant_cue.trim().is_empty() {
        result.push(
            Severity::Error,
            "chat.assistant_cue",
            "assistant cue must not be empty",
        );
    }

    if config.chat.reset_commands.is_empty() {
        result.push(
            Severity::Info,
            "chat.reset_commands",
            "no reset commands; users cannot clear their history",
        );
    }

    match config.server.request_timeout() {
        None => result.push(
            Severity::Info,
            "server.request_timeout_secs",
            "request timeout disabled; a slow backend chain holds the webhook open",
        ),
        Some(request) if request <= config.telegram.send_timeout() => result.push(
            Severity::Error,
            "server.request_timeout_secs",
            format!(
                "request timeout ({}s) must exceed telegram.send_timeout_secs ({}s), otherwise no time is left for inference",
                request.as_secs(),
                config.telegram.send_timeout_secs
            ),
        ),
        Some(request) => {
            let worst = config.worst_case_inference_time() + config.telegram.send_timeout();
            if request < worst {
                result.push(
                    Severity::Warning,
                    "server.request_timeout_secs",
                    format!(
                        "request timeout ({}s) is shorter than the worst case ({}s: every backend attempt timing out, plus delivery); slow chains will be answered with the unavailable message",
                        request.as_secs(),
                        worst.as_secs()
                    ),
                );
            }
        },
    }

    result
}
