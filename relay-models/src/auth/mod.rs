//! Credential resolution for provider API keys.
//!
//! Keys are looked up by name (e.g. `OPENAI_API_KEY`) in two ordered
//! sources: the process environment, then an optional persisted
//! [`KeyValueStore`]. A missing key is not an error here; it only fails once
//! a request is made through a client built without one.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use relay_models::auth::{CredentialResolver, FileStore};
//!
//! let resolver = CredentialResolver::new()
//!     .with_store(Arc::new(FileStore::new(relay_paths::credentials_path())));
//!
//! // Environment wins, then the credentials file, then nothing.
//! let key = resolver.resolve("GROQ_API_KEY");
//! ```

mod file;
mod store;

use std::collections::HashMap;
use std::env;
use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

pub use file::{FileStore, StoreWatcher};
pub use store::{KeyValueStore, KeyringStore, MemoryStore, StoreEvent};

/// A secure API key that prevents accidental logging.
///
/// The key is wrapped in `SecretString` which:
/// - Implements `Debug` as `"[REDACTED]"`
/// - Zeroizes memory on drop
/// - Requires explicit `.expose_secret()` to access the value
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key from a string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into()))
    }

    /// Expose the secret key value.
    ///
    /// Use sparingly - only when actually sending to an API.
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Credential names read by the registry, in provider declaration order.
pub const CREDENTIAL_NAMES: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GROQ_API_KEY",
    "XAI_API_KEY",
    "OPENROUTER_API_KEY",
];

/// Substring that marks a store key as a credential.
pub const CREDENTIAL_MARKER: &str = "API_KEY";

/// Read-only view of environment variables.
///
/// The process environment is the default; tests and embedding hosts can
/// substitute a fixed map.
pub trait EnvSource: Send + Sync {
    /// Look up a variable; `None` when unset.
    fn var(&self, name: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, name: &str) -> Option<String> {
        env::var(name).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, name: &str) -> Option<String> {
        self.get(name).cloned()
    }
}

/// Where a resolved credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// From an environment variable.
    Environment,
    /// From the persisted key-value store.
    Store,
}

impl std::fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Store => write!(f, "store"),
        }
    }
}

/// Resolves credentials from the environment, then a persisted store.
///
/// # Resolution Order
///
/// 1. Environment variable, if set and non-empty
/// 2. Persisted store value, if a store is attached and the value is non-empty
/// 3. Absent
///
/// Store read failures are logged and treated as absence.
#[derive(Clone)]
pub struct CredentialResolver {
    env: Arc<dyn EnvSource>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl CredentialResolver {
    /// Resolver over the process environment with no persisted store.
    pub fn new() -> Self {
        Self {
            env: Arc::new(ProcessEnv),
            store: None,
        }
    }

    /// Replace the environment source.
    pub fn with_env(mut self, env: impl EnvSource + 'static) -> Self {
        self.env = Arc::new(env);
        self
    }

    /// Attach a persisted store as the fallback source.
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// The attached persisted store, if any.
    pub fn store(&self) -> Option<&Arc<dyn KeyValueStore>> {
        self.store.as_ref()
    }

    /// Resolve a credential by name.
    pub fn resolve(&self, name: &str) -> Option<ApiKey> {
        self.lookup(name).map(|(key, _)| key)
    }

    /// Report which source would supply the credential.
    pub fn source(&self, name: &str) -> Option<CredentialSource> {
        self.lookup(name).map(|(_, source)| source)
    }

    fn lookup(&self, name: &str) -> Option<(ApiKey, CredentialSource)> {
        if let Some(value) = self.env.var(name).filter(|v| !v.is_empty()) {
            debug!(name, "resolved credential from environment");
            return Some((ApiKey::new(value), CredentialSource::Environment));
        }

        let store = self.store.as_ref()?;
        match store.get(name) {
            Ok(Some(value)) if !value.is_empty() => {
                debug!(name, "resolved credential from persisted store");
                Some((ApiKey::new(value), CredentialSource::Store))
            }
            Ok(_) => None,
            Err(e) => {
                warn!(name, error = %e, "failed to read credential store");
                None
            }
        }
    }
}

impl Default for CredentialResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("store", &self.store.is_some())
            .finish_non_exhaustive()
    }
}
