//! Short-term conversation memory.
//!
//! Each chat keeps a bounded, in-memory list of turns that feeds prompt
//! assembly. Nothing is persisted: history lives as long as the process.

pub mod message;
pub mod store;

pub use {
    message::{Role, Turn},
    store::ConversationMemory,
};
