//! Keyed async locks.
//!
//! Serializes work per key (a cart line's product ID, an order ID) while
//! letting different keys proceed concurrently. Waiters are served in FIFO
//! order because `tokio::sync::Mutex` is fair.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// A set of async mutexes indexed by key.
pub struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Wait for exclusive access to `key`.
    ///
    /// Entries nobody holds or waits on are pruned on each call.
    pub async fn lock(&self, key: &K) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|k, l| k == key || Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::<String>::new());
        let order = Arc::new(Mutex::new(Vec::new()));

        let guard = locks.lock(&"p1".to_string()).await;
        let waiter = {
            let locks = Arc::clone(&locks);
            let order = Arc::clone(&order);
            tokio::spawn(async move {
                let _guard = locks.lock(&"p1".to_string()).await;
                order.lock().await.push("second");
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        order.lock().await.push("first");
        drop(guard);
        waiter.await.ok();

        assert_eq!(*order.lock().await, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLocks::<String>::new();
        let _p1 = locks.lock(&"p1".to_string()).await;
        let p2 = tokio::time::timeout(Duration::from_millis(100), locks.lock(&"p2".to_string()))
            .await;
        assert!(p2.is_ok());
    }

    #[tokio::test]
    async fn test_released_entries_are_pruned() {
        let locks = KeyedLocks::<String>::new();
        drop(locks.lock(&"p1".to_string()).await);
        drop(locks.lock(&"p2".to_string()).await);
        let _p3 = locks.lock(&"p3".to_string()).await;
        assert_eq!(locks.len().await, 1);
    }
}
