//! Process-wide bound on concurrent network transfers
//!
//! Every page or archive transfer holds a [`TransferPermit`] for exactly the
//! duration of one HTTP attempt. Cache checks and metadata lookups never touch the
//! gate. The permit releases on drop, so success, error, panic unwinding, and
//! future cancellation all return it.

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Counting gate shared by all fetches (cloneable - all fields are Arc-wrapped)
#[derive(Clone, Debug)]
pub struct TransferGate {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

/// A held transfer permit; dropping it frees the slot
#[derive(Debug)]
pub struct TransferPermit {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for TransferPermit {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

impl TransferGate {
    /// Create a gate with `capacity` permits (a capacity of zero is raised to one)
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait until a permit is available
    pub async fn acquire(&self) -> Result<TransferPermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| Error::Other("transfer gate closed".into()))?;
        Ok(self.track(permit))
    }

    /// Wait at most `limit` for a permit
    pub async fn acquire_timeout(&self, limit: Duration) -> Result<TransferPermit> {
        match tokio::time::timeout(limit, self.acquire()).await {
            Ok(permit) => permit,
            Err(_) => Err(Error::GateTimeout { waited: limit }),
        }
    }

    fn track(&self, permit: OwnedSemaphorePermit) -> TransferPermit {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        TransferPermit {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        }
    }

    /// Configured number of permits
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of permits ever held at once
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
