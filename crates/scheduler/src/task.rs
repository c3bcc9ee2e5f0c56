use chrono::{DateTime, Utc};
use dts_wire::TaskPayload;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque task identifier.
///
/// Freshly submitted tasks get a UUID v4 string; ids arriving from workers are
/// taken as-is so results for any id can be correlated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<String> for TaskId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for TaskId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unit of work waiting for a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: TaskId,
    pub data: String,
    pub submitted_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with a freshly generated id.
    pub fn new(data: impl Into<String>) -> Self {
        Self::with_id(TaskId::generate(), data)
    }

    pub fn with_id(id: impl Into<TaskId>, data: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
            submitted_at: Utc::now(),
        }
    }

    /// Body of the `TASK` frame sent to a worker.
    pub fn to_payload(&self) -> TaskPayload {
        TaskPayload {
            id: self.id.to_string(),
            data: self.data.clone(),
        }
    }
}
