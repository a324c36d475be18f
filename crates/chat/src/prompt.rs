//! Transcript-style prompt assembly and continuation extraction.
//!
//! Completion models (GPT-2 and friends) have no chat format, so history is
//! rendered as a plain transcript:
//!
//! ```text
//! User: hi
//! AI: hello!
//! User: how are you?
//! AI:
//! ```
//!
//! The model continues after the trailing cue, usually echoing the prompt.

use parley_sessions::{Role, Turn};

/// Role markers used in the transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptMarkers {
    pub user: String,
    pub assistant: String,
}

impl Default for TranscriptMarkers {
    fn default() -> Self {
        Self {
            user: "User:".into(),
            assistant: "AI:".into(),
        }
    }
}

/// Render `history` plus the new user message, ending with the assistant cue.
#[must_use]
pub fn build_transcript(history: &[Turn], user_text: &str, markers: &TranscriptMarkers) -> String {
    let mut prompt = String::new();
    for turn in history {
        let marker = match turn.role {
            Role::User => &markers.user,
            Role::Assistant => &markers.assistant,
        };
        push_line(&mut prompt, marker, &turn.content);
    }
    push_line(&mut prompt, &markers.user, user_text);
    prompt.push_str(&markers.assistant);
    prompt
}

fn push_line(prompt: &mut String, marker: &str, content: &str) {
    prompt.push_str(marker);
    prompt.push(' ');
    prompt.push_str(content.trim());
    prompt.push('\n');
}

/// Keep only what follows the last assistant cue, trimmed.
///
/// Backends that echo the prompt return the whole transcript; backends that
/// don't return just the continuation, which passes through unchanged. If
/// the model itself writes the cue, only the text after its last occurrence
/// survives.
#[must_use]
pub fn extract_continuation<'a>(generated: &'a str, assistant_cue: &str) -> &'a str {
    let tail = match generated.rfind(assistant_cue) {
        Some(idx) if !assistant_cue.is_empty() => &generated[idx + assistant_cue.len()..],
        _ => generated,
    };
    tail.trim()
}

/// Case-insensitive match against the reset vocabulary.
#[must_use]
pub fn is_reset_command(text: &str, commands: &[String]) -> bool {
    let text = text.trim().to_lowercase();
    commands.iter().any(|c| c.trim().to_lowercase() == text)
}
