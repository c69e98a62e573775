//! Reacting to credential changes in a persisted store.

use std::fmt;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::auth::{CREDENTIAL_MARKER, StoreEvent};

type Action = Arc<dyn Fn() + Send + Sync>;

/// Runs a reload action when a credential-looking key changes.
#[derive(Clone)]
pub struct ReloadListener {
    action: Action,
}

impl ReloadListener {
    pub fn new(action: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            action: Arc::new(action),
        }
    }

    /// Handle one event. Returns whether the action ran.
    ///
    /// Clears (`key == None`) and keys without `API_KEY` in them are ignored.
    pub fn handle(&self, event: &StoreEvent) -> bool {
        let triggers = Self::triggers(event);
        if triggers {
            (self.action)();
        }
        triggers
    }

    fn triggers(event: &StoreEvent) -> bool {
        match event.key.as_deref() {
            Some(key) if key.contains(CREDENTIAL_MARKER) => {
                info!(key, "credential changed; reloading");
                true
            }
            _ => {
                debug!(key = ?event.key, "ignoring store event");
                false
            }
        }
    }

    /// Run the action on the blocking pool; reloads read files and the keyring.
    async fn run_blocking(&self) {
        let action = Arc::clone(&self.action);
        if let Err(e) = tokio::task::spawn_blocking(move || action()).await {
            warn!(error = %e, "reload action panicked");
        }
    }

    /// Consume events until the channel closes.
    ///
    /// The action runs on the blocking thread pool, one reload at a time. A
    /// lagged receiver lost an unknown batch of events, so the action runs
    /// once for the whole batch.
    pub fn spawn(self, mut events: broadcast::Receiver<StoreEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        if Self::triggers(&event) {
                            self.run_blocking().await;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "store events dropped; reloading once");
                        self.run_blocking().await;
                    }
                    Err(RecvError::Closed) => {
                        debug!("store event channel closed");
                        break;
                    }
                }
            }
        })
    }
}

impl fmt::Debug for ReloadListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReloadListener").finish_non_exhaustive()
    }
}
