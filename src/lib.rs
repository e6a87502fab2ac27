//! Console chat client for a local Ollama server.
//!
//! ## Configuration
//!
//! Settings are read from the environment once at startup:
//!
//! - `OLLAMA_BASE_URL`: server endpoint, default `http://localhost:11434`.
//! - `OLLAMA_CHAT_TIMEOUT_SEC`: connect and read timeout in seconds, default 60.
//!   Must be greater than zero.
//! - `OLLAMA_CHAT_PROVIDER`: `ollama` (default) or `mock` for an offline scripted
//!   provider.
//! - `OLLAMA_CHAT_SYSTEM_INSTRUCTIONS`: replaces the built-in system instruction that
//!   prefixes every request. Blank values fall back to the default.
//!
//! Logging goes to stderr through `tracing`; filter it with `RUST_LOG`.
//!
//! ## Session model
//!
//! Each model keeps its own conversation. Switching models replays that model's
//! turns; a reply that is still streaming keeps accumulating for the model it was
//! requested from. Only the finished reply is stored, and a failed stream stores
//! nothing.

pub mod app;
pub mod attachment;
pub mod commands;
pub mod config;
pub mod providers;
pub mod runtime;
pub mod sink;
pub mod store;
