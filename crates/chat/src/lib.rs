//! Chat orchestration: turns one inbound message into exactly one reply.
//!
//! Messages that need no model call are answered directly. Backend failures
//! become apology text, so callers never see an error.

pub mod orchestrator;
pub mod prompt;

pub use orchestrator::{ChatOrchestrator, ChatSettings, Reply, ReplyKind};
