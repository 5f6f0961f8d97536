//! Per-key build serialization
//!
//! Holders of a key's guard run one at a time. Callers re-check the store
//! after acquiring, so the second of two concurrent misses reads the first
//! one's build instead of starting its own.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Map of key to in-flight lock
#[derive(Default)]
pub struct BuildCoalescer {
    inflight: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Exclusive hold on one key; releases and prunes the key on drop
pub struct CoalesceGuard<'a> {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    owner: &'a BuildCoalescer,
}

impl BuildCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other holder owns `key`, then own it
    pub async fn acquire(&self, key: &str) -> CoalesceGuard<'_> {
        let lock = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(Mutex::new(()))),
            )
        };

        CoalesceGuard {
            guard: Some(lock.lock_owned().await),
            key: key.to_string(),
            owner: self,
        }
    }

    /// Number of keys currently held or awaited
    pub fn inflight(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for CoalesceGuard<'_> {
    fn drop(&mut self) {
        // Release first so the strong count below only counts the map and waiters
        drop(self.guard.take());

        let mut inflight = self.owner.inflight.lock().unwrap_or_else(|e| e.into_inner());
        if inflight
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            inflight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_serialized() {
        let coalescer = Arc::new(BuildCoalescer::new());
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let coalescer = coalescer.clone();
            let active = active.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                let _guard = coalescer.acquire("demo@v1").await;
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
        assert_eq!(coalescer.inflight(), 0);
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let coalescer = BuildCoalescer::new();

        let _a = coalescer.acquire("demo@v1").await;
        let b = tokio::time::timeout(Duration::from_secs(1), coalescer.acquire("demo@v2")).await;

        assert!(b.is_ok());
        assert_eq!(coalescer.inflight(), 2);
    }

    #[tokio::test]
    async fn released_keys_are_pruned() {
        let coalescer = BuildCoalescer::new();
        {
            let _guard = coalescer.acquire("demo@v1").await;
            assert_eq!(coalescer.inflight(), 1);
        }
        assert_eq!(coalescer.inflight(), 0);
    }
}
