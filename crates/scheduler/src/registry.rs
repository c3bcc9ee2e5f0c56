//! Registry of live worker connections.
//!
//! A [`WorkerHandle`] owns the write side of one worker's transport. Handles
//! are added when a session starts and removed when it ends, so a handle is
//! present exactly while its connection is open.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dts_wire::{write_frame, Frame, WireError};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Process-unique worker identifier.
pub type WorkerId = u64;

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// How [`WorkerRegistry::select_one`] picks among live workers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Rotate through workers in registration order.
    #[default]
    RoundRobin,
    /// Always pick the longest-connected worker.
    First,
}

impl std::str::FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "round_robin" => Ok(Self::RoundRobin),
            "first" => Ok(Self::First),
            other => Err(format!(
                "invalid selection policy '{other}', expected 'round_robin' or 'first'"
            )),
        }
    }
}

/// One live worker connection.
pub struct WorkerHandle {
    id: WorkerId,
    peer: String,
    connected_at: DateTime<Utc>,
    writer: Mutex<BoxedWriter>,
}

impl WorkerHandle {
    pub fn new<W>(id: WorkerId, peer: impl Into<String>, writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            id,
            peer: peer.into(),
            connected_at: Utc::now(),
            writer: Mutex::new(Box::new(writer)),
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Transport endpoint of the worker (e.g. `127.0.0.1:53412`).
    pub fn peer(&self) -> &str {
        &self.peer
    }

    pub fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }

    /// Write one frame to the worker and flush.
    pub async fn send(&self, frame: &Frame) -> Result<(), WireError> {
        let mut writer = self.writer.lock().await;
        write_frame(&mut *writer, frame).await
    }

    /// Shut down the write side. Errors are irrelevant at this point.
    pub async fn close(&self) {
        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::debug!(worker = %self.peer, error = %e, "worker transport shutdown failed");
        }
    }
}

impl std::fmt::Debug for WorkerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerHandle")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("connected_at", &self.connected_at)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct Inner {
    handles: Vec<Arc<WorkerHandle>>,
    cursor: usize,
}

/// Task-safe set of live workers.
#[derive(Debug)]
pub struct WorkerRegistry {
    inner: Mutex<Inner>,
    policy: SelectionPolicy,
    next_id: AtomicU64,
}

impl WorkerRegistry {
    pub fn new(policy: SelectionPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            policy,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Allocate an id for a new connection.
    pub fn next_worker_id(&self) -> WorkerId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn add(&self, handle: Arc<WorkerHandle>) {
        let mut inner = self.inner.lock().await;
        if inner.handles.iter().any(|h| h.id == handle.id) {
            return;
        }
        inner.handles.push(handle);
    }

    /// Remove a worker. Removing an absent worker is a no-op.
    ///
    /// Returns the handle only to the caller that actually removed it.
    pub async fn remove(&self, id: WorkerId) -> Option<Arc<WorkerHandle>> {
        let mut inner = self.inner.lock().await;
        let pos = inner.handles.iter().position(|h| h.id == id)?;
        let handle = inner.handles.remove(pos);
        // Keep the rotation pointing at the same next worker.
        if pos < inner.cursor {
            inner.cursor -= 1;
        }
        Some(handle)
    }

    /// Pick a live worker according to the policy. Never blocks on an empty registry.
    pub async fn select_one(&self) -> Option<Arc<WorkerHandle>> {
        let mut inner = self.inner.lock().await;
        if inner.handles.is_empty() {
            return None;
        }
        match self.policy {
            SelectionPolicy::First => inner.handles.first().cloned(),
            SelectionPolicy::RoundRobin => {
                let idx = inner.cursor % inner.handles.len();
                inner.cursor = idx + 1;
                Some(inner.handles[idx].clone())
            }
        }
    }

    pub async fn contains(&self, id: WorkerId) -> bool {
        self.inner.lock().await.handles.iter().any(|h| h.id == id)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.handles.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.handles.is_empty()
    }

    /// Peers of all live workers, in registration order.
    pub async fn peers(&self) -> Vec<String> {
        self.inner
            .lock()
            .await
            .handles
            .iter()
            .map(|h| h.peer.clone())
            .collect()
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new(SelectionPolicy::default())
    }
}
