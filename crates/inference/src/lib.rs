//! Inference backend access: one-shot HTTP client, warm-up retries, and the
//! ordered fallback chain across configured backends.
//!
//! Every layer speaks [`InferenceOutcome`], so retry and fallback decisions
//! are made on the outcome tag rather than by inspecting reply text.

pub mod backend;
pub mod error;
pub mod fallback;
pub mod outcome;
pub mod retry;

pub use {
    backend::{BackendTarget, HttpBackend, InferenceBackend},
    error::{Error, Result},
    fallback::FallbackChain,
    outcome::{GenerationParams, InferenceOutcome, InferenceRequest},
    retry::{RetryPolicy, with_retry},
};
