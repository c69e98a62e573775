//! Provider registry for relay.
//!
//! This crate provides:
//! - Credential resolution (environment first, then a persisted store)
//! - One client per hosted provider, bound to an injected transport
//! - A fixed catalog of models, dispatchable by identifier
//! - Reasoning extraction for models that emit `<think>` blocks
//! - A listener that reloads when stored credentials change
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                      Registry                        │
//! │   ModelHandle ... ModelHandle (+ ModelInfo each)     │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                  ProviderClients                     │
//! │  OpenAI  Anthropic  Groq  XAI  OpenRouter            │
//! └─────────────────────────────────────────────────────┘
//!                          │
//!                          ▼
//! ┌─────────────────────────────────────────────────────┐
//! │                CredentialResolver                    │
//! │      (Environment, then File or Keyring store)      │
//! └─────────────────────────────────────────────────────┘
//! ```

mod error;
mod types;

pub mod auth;
pub mod config;
pub mod middleware;
pub mod providers;
pub mod registry;
pub mod reload;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
pub use registry::{DEFAULT_MODEL, MODELS, ModelHandle, Registry};
pub use types::{ModelId, ModelInfo, ModelInfoBuilder};
