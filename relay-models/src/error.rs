//! Error types for the provider registry.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building or using the registry.
#[derive(Debug, Error)]
pub enum Error {
    /// Model not found in registry.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Configured default model is not part of the registry.
    #[error("default model is not registered: {0}")]
    UnknownDefaultModel(String),

    /// No credential was resolved for the provider; raised at request time.
    #[error("credentials not found for provider: {0}")]
    CredentialsNotFound(String),

    /// Provider name does not match any supported provider.
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    /// No transport was injected for the provider.
    #[error("no transport configured for provider: {0}")]
    TransportUnavailable(String),

    /// Failed to access system keyring.
    #[error("keyring error: {0}")]
    Keyring(String),

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),

    /// Persisted key-value store failure.
    #[error("credential store error: {0}")]
    Store(String),

    /// Failed to watch the persisted store for changes.
    #[error("watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Provider API error.
    #[error("provider API error: {0}")]
    ProviderApi(String),

    /// Request failed.
    #[error("request failed: {0}")]
    Request(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
