//! Configuration loading, validation, and env substitution.
//!
//! Config files: `parley.toml`, `parley.yaml`, or `parley.json`
//! Searched in `./` then `~/.config/parley/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    error::{Error, Result},
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{
        BackendConfig, ChatConfig, ChatMessages, GenerationConfig, MemoryConfig, ParleyConfig,
        RetryConfig, ServerConfig, TelegramConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult, validate},
};
