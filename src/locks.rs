//! Per-artwork mutual exclusion
//!
//! [`EntityLocks`] hands out one async mutex per [`ArtworkId`], created on first
//! use under the registry lock so concurrent callers for the same ID always share
//! the same mutex. Entries are dropped again once nobody holds or waits on them;
//! an entry that lingers is harmless because it owns no resources.

use crate::error::{Error, Result};
use crate::types::ArtworkId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;

type Registry = Arc<Mutex<HashMap<ArtworkId, Arc<tokio::sync::Mutex<()>>>>>;

/// Registry of per-artwork locks (cloneable - all fields are Arc-wrapped)
#[derive(Clone, Debug, Default)]
pub struct EntityLocks {
    registry: Registry,
}

/// Exclusive hold on one artwork; released on drop
#[derive(Debug)]
pub struct EntityGuard {
    id: ArtworkId,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl EntityGuard {
    /// Artwork this guard protects
    pub fn id(&self) -> &ArtworkId {
        &self.id
    }
}

impl Drop for EntityGuard {
    fn drop(&mut self) {
        // Unlock before pruning so a waiter can never observe a removed-but-held entry
        self.guard.take();
        prune(&self.registry, &self.id);
    }
}

impl EntityLocks {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for `id`, waiting at most `timeout`
    pub async fn lock(&self, id: &ArtworkId, timeout: Duration) -> Result<EntityGuard> {
        self.lock_cancellable(id, timeout, &CancellationToken::new())
            .await
    }

    /// Acquire the lock for `id`, giving up on timeout or when `cancel` fires
    pub async fn lock_cancellable(
        &self,
        id: &ArtworkId,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<EntityGuard> {
        let mutex = self.get_or_create(id);

        let outcome = tokio::select! {
            _ = cancel.cancelled() => Err(Error::Cancelled),
            acquired = tokio::time::timeout(timeout, mutex.lock_owned()) => {
                acquired.map_err(|_| Error::LockTimeout {
                    id: id.to_string(),
                    waited: timeout,
                })
            }
        };

        match outcome {
            Ok(guard) => Ok(EntityGuard {
                id: id.clone(),
                guard: Some(guard),
                registry: self.registry.clone(),
            }),
            Err(e) => {
                tracing::warn!(artwork_id = %id, error = %e, "could not acquire artwork lock");
                prune(&self.registry, id);
                Err(e)
            }
        }
    }

    /// Run `operation` while holding the lock for `id`
    ///
    /// The lock is released when `operation` completes, fails, or is dropped.
    pub async fn with_lock<F, Fut, T>(
        &self,
        id: &ArtworkId,
        timeout: Duration,
        operation: F,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let _guard = self.lock(id, timeout).await?;
        operation().await
    }

    /// Number of artworks with a live registry entry
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Whether no artwork currently has a registry entry
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn get_or_create(&self, id: &ArtworkId) -> Arc<tokio::sync::Mutex<()>> {
        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        registry
            .entry(id.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }
}

/// Drop the entry for `id` if the registry holds the only reference to it
fn prune(registry: &Registry, id: &ArtworkId) {
    let mut registry = registry
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Some(entry) = registry.get(id) {
        // Every holder and waiter cloned the Arc under this same lock
        if Arc::strong_count(entry) == 1 {
            registry.remove(id);
        }
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn id(s: &str) -> ArtworkId {
        ArtworkId::new(s).unwrap()
    }

    #[tokio::test]
    async fn same_id_is_serialized() {
        let locks = EntityLocks::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_inside = max_inside.clone();
            handles.push(tokio::spawn(async move {
                locks
                    .with_lock(&id("42"), Duration::from_secs(5), || async {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_inside.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        inside.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_ids_do_not_contend() {
        let locks = EntityLocks::new();
        let _a = locks.lock(&id("a"), Duration::from_secs(1)).await.unwrap();
        let b = locks.lock(&id("b"), Duration::from_millis(50)).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn timeout_reports_lock_timeout() {
        let locks = EntityLocks::new();
        let _held = locks.lock(&id("7"), Duration::from_secs(1)).await.unwrap();
        let err = locks
            .lock(&id("7"), Duration::from_millis(30))
            .await
            .unwrap_err();
        match err {
            Error::LockTimeout { id, waited } => {
                assert_eq!(id, "7");
                assert_eq!(waited, Duration::from_millis(30));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        // The holder keeps the entry alive
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn cancel_aborts_wait() {
        let locks = EntityLocks::new();
        let _held = locks.lock(&id("9"), Duration::from_secs(1)).await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = locks
            .lock_cancellable(&id("9"), Duration::from_secs(30), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[tokio::test]
    async fn entries_are_pruned_after_release() {
        let locks = EntityLocks::new();
        {
            let guard = locks.lock(&id("1"), Duration::from_secs(1)).await.unwrap();
            assert_eq!(guard.id().as_str(), "1");
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn errors_inside_with_lock_still_release() {
        let locks = EntityLocks::new();
        let result: Result<()> = locks
            .with_lock(&id("5"), Duration::from_secs(1), || async {
                Err(Error::Other("boom".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(
            locks
                .lock(&id("5"), Duration::from_millis(50))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn waiter_keeps_entry_while_holder_releases() {
        let locks = EntityLocks::new();
        let held = locks.lock(&id("x"), Duration::from_secs(1)).await.unwrap();

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move { locks.lock(&id("x"), Duration::from_secs(5)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(held);

        let second = waiter.await.unwrap().unwrap();
        assert_eq!(locks.len(), 1);
        drop(second);
        assert!(locks.is_empty());
    }
}
