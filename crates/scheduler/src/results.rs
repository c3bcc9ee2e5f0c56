//! Completed results keyed by task id.
//!
//! Without a TTL the store grows without bound for the life of the process.
//! With a TTL, [`ResultStore::run_sweeper`] evicts entries older than it.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tracing::debug;

use crate::shutdown::stop_requested;
use crate::task::TaskId;

/// A stored result value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResult {
    pub value: String,
    pub completed_at: DateTime<Utc>,
    recorded: Instant,
}

#[derive(Debug, Default)]
pub struct ResultStore {
    entries: RwLock<HashMap<TaskId, StoredResult>>,
    ttl: Option<Duration>,
}

impl ResultStore {
    /// Create an unbounded store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose entries expire `ttl` after being written.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    /// Record a result. A later write for the same id replaces the earlier one.
    ///
    /// Returns the replaced value, if any.
    pub async fn put(&self, task_id: TaskId, value: impl Into<String>) -> Option<String> {
        let entry = StoredResult {
            value: value.into(),
            completed_at: Utc::now(),
            recorded: Instant::now(),
        };
        self.entries
            .write()
            .await
            .insert(task_id, entry)
            .map(|old| old.value)
    }

    pub async fn get(&self, task_id: &TaskId) -> Option<String> {
        self.entries
            .read()
            .await
            .get(task_id)
            .map(|e| e.value.clone())
    }

    pub async fn get_entry(&self, task_id: &TaskId) -> Option<StoredResult> {
        self.entries.read().await.get(task_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop entries recorded more than the TTL before `now`.
    ///
    /// Returns the number of evicted entries. A store without a TTL never evicts.
    pub async fn evict_expired(&self, now: Instant) -> usize {
        let Some(ttl) = self.ttl else {
            return 0;
        };
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now.saturating_duration_since(e.recorded) <= ttl);
        before - entries.len()
    }

    /// Periodically evict expired entries until `shutdown` flips to `true`.
    pub async fn run_sweeper(&self, interval: Duration, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.evict_expired(Instant::now()).await;
                    if evicted > 0 {
                        debug!(evicted, "evicted expired results");
                    }
                }
                _ = stop_requested(&mut shutdown) => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get() {
        let store = ResultStore::new();
        assert!(store.put("t1".into(), "abc").await.is_none());
        assert_eq!(store.get(&"t1".into()).await.as_deref(), Some("abc"));
        assert!(store.get(&"missing".into()).await.is_none());
    }

    #[tokio::test]
    async fn second_put_overwrites() {
        let store = ResultStore::new();
        store.put("t1".into(), "abc").await;
        let previous = store.put("t1".into(), "def").await;

        assert_eq!(previous.as_deref(), Some("abc"));
        assert_eq!(store.get(&"t1".into()).await.as_deref(), Some("def"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn unbounded_store_never_evicts() {
        let store = ResultStore::new();
        store.put("t1".into(), "abc").await;
        let far_future = Instant::now() + Duration::from_secs(86_400);
        assert_eq!(store.evict_expired(far_future).await, 0);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn ttl_evicts_only_old_entries() {
        let store = ResultStore::with_ttl(Duration::from_secs(60));
        store.put("t1".into(), "abc").await;

        assert_eq!(store.evict_expired(Instant::now()).await, 0);
        assert_eq!(store.len().await, 1);

        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(store.evict_expired(later).await, 1);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn entry_carries_completion_time() {
        let store = ResultStore::new();
        let before = Utc::now();
        store.put("t1".into(), "abc").await;
        let entry = store.get_entry(&"t1".into()).await.unwrap();
        assert_eq!(entry.value, "abc");
        assert!(entry.completed_at >= before);
    }

    #[test]
    fn sweeper_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let store = ResultStore::with_ttl(Duration::from_secs(1));
        let (_tx, rx) = watch::channel(false);
        let fut = store.run_sweeper(Duration::from_secs(1), rx);
        assert_send(&fut);
    }

    #[tokio::test]
    async fn sweeper_evicts_then_stops() {
        let store = std::sync::Arc::new(ResultStore::with_ttl(Duration::from_millis(50)));
        store.put("t1".into(), "abc").await;

        let (tx, rx) = watch::channel(false);
        let s = store.clone();
        let sweeper = tokio::spawn(async move { s.run_sweeper(Duration::from_millis(20), rx).await });

        tokio::time::timeout(Duration::from_secs(2), async {
            while !store.is_empty().await {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("expired entry should be swept");

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), sweeper)
            .await
            .expect("sweeper should stop")
            .unwrap();
    }
}
