//! Holding a transaction back.
//!
//! [`GatedStore`] parks the next transaction before it reaches the wrapped
//! store, so a test can run reads and move the clock while a write is
//! waiting its turn, the way a busy database would make it wait.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use castsync_store::{Store, StoreError, StoreTx};

/// A store whose next transaction waits for [`GatedStore::release`].
pub struct GatedStore<S> {
    inner: S,
    armed: AtomicBool,
    parked: Notify,
    gate: Semaphore,
}

impl<S: Store> GatedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            armed: AtomicBool::new(false),
            parked: Notify::new(),
            gate: Semaphore::new(0),
        }
    }

    /// Park the next transaction at the gate.
    pub fn hold_next(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    /// Resolve once a held transaction is waiting at the gate.
    pub async fn wait_until_parked(&self) {
        self.parked.notified().await;
    }

    /// Let one parked transaction through.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait]
impl<S: Store> Store for GatedStore<S> {
    async fn transaction<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.parked.notify_one();
            self.gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?
                .forget();
        }
        self.inner.transaction(f).await
    }

    async fn read<F, T, E>(&self, f: F) -> std::result::Result<T, E>
    where
        F: FnOnce(&dyn StoreTx) -> std::result::Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        self.inner.read(f).await
    }
}
