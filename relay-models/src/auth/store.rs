//! Persisted key-value stores for credentials.

use std::collections::BTreeMap;
use std::sync::RwLock;

use tokio::sync::broadcast;
use tracing::debug;

use super::CREDENTIAL_NAMES;
use crate::{Error, Result};

/// Capacity of change-event channels.
pub(crate) const EVENT_CAPACITY: usize = 64;

/// A persisted string-to-string store, the fallback credential source.
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is not present.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any existing one.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;

    /// List keys currently present.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Notification that a store entry changed.
///
/// `key` is `None` when the whole store was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreEvent {
    pub key: Option<String>,
}

impl StoreEvent {
    /// Event for a single changed key.
    pub fn changed(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    /// Event for a cleared store.
    pub fn cleared() -> Self {
        Self { key: None }
    }
}

/// In-process store that broadcasts a [`StoreEvent`] on every mutation.
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
    events: broadcast::Sender<StoreEvent>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(BTreeMap::new()),
            events,
        }
    }

    /// Subscribe to change events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    /// Remove every entry, emitting a single clear event.
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.emit(StoreEvent::cleared());
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value.to_string());
        self.emit(StoreEvent::changed(key));
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let removed = self
            .entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        if removed.is_some() {
            self.emit(StoreEvent::changed(key));
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        Ok(entries.keys().cloned().collect())
    }
}

/// Store backed by the system keyring.
///
/// Each key is a keyring entry under one service name. The keyring cannot
/// enumerate entries, so [`keys`](KeyValueStore::keys) only reports the known
/// credential names. It emits no change events.
pub struct KeyringStore {
    service_name: String,
}

impl KeyringStore {
    /// Create a keyring store for a service identifier (e.g., "relay").
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    /// The service identifier used for keyring entries.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service_name, key).map_err(|e| Error::Keyring(e.to_string()))
    }
}

impl KeyValueStore for KeyringStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(Error::Keyring(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Keyring(e.to_string()))?;
        debug!(key, "stored credential in keyring");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => {
                debug!(key, "removed credential from keyring");
                Ok(())
            }
            Err(e) => Err(Error::Keyring(e.to_string())),
        }
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(CREDENTIAL_NAMES
            .iter()
            .filter(|name| matches!(self.get(name), Ok(Some(_))))
            .map(|name| name.to_string())
            .collect())
    }
}
