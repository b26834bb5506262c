//! Connection registry: one lazily created, reused-until-stale handle per backend.

use crate::backend::BackendKind;
use crate::types::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMappedMutexGuard, OwnedMutexGuard};

/// Creates and health-checks handles for one backend.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    type Handle: Send;

    fn backend(&self) -> BackendKind;

    /// Construct a new handle. Failures are connection errors.
    async fn acquire(&self) -> Result<Self::Handle>;

    /// Whether an existing handle can still be used.
    async fn is_alive(&self, handle: &mut Self::Handle) -> bool;
}

/// Exclusive access to a backend's handle until dropped.
pub type Lease<H> = OwnedMappedMutexGuard<Option<H>, H>;

/// Lock-protected holder of a backend's single handle.
///
/// A lease holds the lock, so calls against one backend are serialized.
pub struct ConnectionSlot<H> {
    provider: Arc<dyn ConnectionProvider<Handle = H>>,
    handle: Arc<Mutex<Option<H>>>,
    opened: AtomicU64,
    connect_timeout: Duration,
}

impl<H: Send> ConnectionSlot<H> {
    pub fn new(provider: Arc<dyn ConnectionProvider<Handle = H>>, connect_timeout: Duration) -> Self {
        Self {
            provider,
            handle: Arc::new(Mutex::new(None)),
            opened: AtomicU64::new(0),
            connect_timeout,
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.provider.backend()
    }

    /// Lease the handle, creating it when absent or stale.
    pub async fn lease(&self) -> Result<Lease<H>> {
        let mut slot = self.handle.clone().lock_owned().await;

        let handle = match slot.take() {
            Some(mut existing) => {
                let alive = tokio::time::timeout(
                    self.connect_timeout,
                    self.provider.is_alive(&mut existing),
                )
                .await
                .unwrap_or(false);
                if alive {
                    existing
                } else {
                    tracing::info!(backend = %self.backend(), "connection handle is stale, reconnecting");
                    drop(existing);
                    self.open().await?
                }
            }
            None => self.open().await?,
        };

        Ok(OwnedMutexGuard::map(slot, |slot| slot.insert(handle)))
    }

    /// Drop the current handle; the next lease reconnects.
    pub async fn reset(&self) {
        if self.handle.lock().await.take().is_some() {
            tracing::debug!(backend = %self.backend(), "connection handle discarded");
        }
    }

    /// Number of handles created over the slot's lifetime.
    pub fn connections_opened(&self) -> u64 {
        self.opened.load(Ordering::Relaxed)
    }

    /// Whether a handle is currently held. A slot busy with a call counts as connected.
    pub fn is_connected(&self) -> bool {
        self.handle
            .try_lock()
            .map(|slot| slot.is_some())
            .unwrap_or(true)
    }

    async fn open(&self) -> Result<H> {
        let backend = self.backend();
        let handle = tokio::time::timeout(self.connect_timeout, self.provider.acquire())
            .await
            .map_err(|_| {
                Error::connection(format!(
                    "{backend} did not accept a connection within {}s",
                    self.connect_timeout.as_secs_f64()
                ))
            })?
            .map_err(|err| match err {
                Error::Connection(_) => err,
                other => Error::connection(other.to_string()),
            })?;

        let opened = self.opened.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(backend = %backend, opened, "opened connection handle");
        Ok(handle)
    }
}

impl<H: Send> fmt::Debug for ConnectionSlot<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionSlot")
            .field("backend", &self.provider.backend())
            .field("opened", &self.opened.load(Ordering::Relaxed))
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}
