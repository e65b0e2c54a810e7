//! Shared, reloadable configuration.
//!
//! Settings are never mutated in place: a reload builds a fresh value and
//! swaps the `Arc` published on a `watch` channel. Readers holding an older
//! `Arc` keep a consistent snapshot.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use super::loader::{ConfigError, ConfigLoader};
use crate::domain::models::Settings;

/// Current configuration plus the loader that produced it
#[derive(Debug)]
pub struct ConfigHandle {
    loader: ConfigLoader,
    tx: watch::Sender<Arc<Settings>>,
}

impl ConfigHandle {
    /// Perform the initial load; any error is fatal
    pub fn new(loader: ConfigLoader) -> Result<Self, ConfigError> {
        let settings = loader.load()?;
        let (tx, _rx) = watch::channel(Arc::new(settings));
        Ok(Self { loader, tx })
    }

    /// Snapshot of the current configuration
    pub fn current(&self) -> Arc<Settings> {
        Arc::clone(&self.tx.borrow())
    }

    /// Receiver notified each time a reload swaps in a new value
    pub fn subscribe(&self) -> watch::Receiver<Arc<Settings>> {
        self.tx.subscribe()
    }

    /// Rebuild the configuration from its source.
    ///
    /// Returns whether the value changed. On error the current value stays
    /// in place.
    pub fn reload(&self) -> Result<bool, ConfigError> {
        let fresh = self.loader.load().inspect_err(|err| {
            warn!(source = %self.loader.source(), error = %err, "reload failed, keeping current configuration");
        })?;

        let changed = self.tx.send_if_modified(|current| {
            if **current == fresh {
                false
            } else {
                *current = Arc::new(fresh);
                true
            }
        });

        info!(source = %self.loader.source(), changed, "configuration reloaded");
        Ok(changed)
    }
}
