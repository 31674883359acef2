//! Per-commit run serialization
//!
//! Two deliveries of the same commit share a workspace slot. Each pipeline
//! run holds the lock for its `(repository, commit)` key from
//! materialization until its tests finish, so such runs execute one after
//! the other instead of deleting each other's tree. Runs for different keys
//! never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of advisory locks keyed by workspace key
#[derive(Debug, Default)]
pub struct CommitLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held lock for one key; released, and the key forgotten when unused,
/// on drop
pub struct CommitGuard<'a> {
    registry: &'a CommitLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CommitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other run holds `key`, then holds it
    pub async fn acquire(&self, key: &str) -> CommitGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(key.to_string()).or_default())
        };

        let guard = lock.lock_owned().await;

        CommitGuard {
            registry: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        // Release before inspecting the reference count
        self.guard.take();

        let mut locks = self
            .registry
            .locks
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = locks.get(&self.key) {
            // Only the registry's own reference left: nobody holds or waits
            if Arc::strong_count(lock) == 1 {
                locks.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(CommitLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let locks = Arc::clone(&locks);
            let active = Arc::clone(&active);
            let peak = Arc::clone(&peak);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("repo-abcd1234").await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = CommitLocks::new();
        let _first = locks.acquire("repo-aaaa").await;

        let second = tokio::time::timeout(Duration::from_secs(1), locks.acquire("repo-bbbb")).await;

        assert!(second.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn test_key_is_forgotten_after_release() {
        let locks = CommitLocks::new();
        {
            let _guard = locks.acquire("repo-abcd1234").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }
}
