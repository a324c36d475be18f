//! Gateway: the HTTP edge of parley.
//!
//! Lifecycle:
//! 1. Build the fallback chain, memory store and Telegram relay from config
//! 2. Bind the listener
//! 3. Serve `POST /webhook` and `GET /health` until Ctrl-C
//! 4. Drop all conversation memory on shutdown

pub mod server;
pub mod state;
pub mod webhook;

pub use {
    server::{build_app, start_gateway},
    state::{GatewayState, build_orchestrator},
};
