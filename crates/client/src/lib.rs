//! HTTP client for the scheduler's submission API.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Client for the dts-server REST API.
pub struct SchedulerClient {
    base_url: String,
    http: reqwest::Client,
}

/// A completed task as reported by the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub result: String,
    pub completed_at: DateTime<Utc>,
}

/// Scheduler status from `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    pub status: String,
    pub workers: usize,
    pub queued: usize,
}

#[derive(Serialize)]
struct SubmitBody<'a> {
    data: &'a str,
}

#[derive(Deserialize)]
struct SubmitReply {
    id: String,
}

impl SchedulerClient {
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::new();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Check the server is reachable and report its status.
    pub async fn health(&self) -> Result<Health> {
        let url = format!("{}/health", self.base_url);
        let resp = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(3))
            .send()
            .await
            .context("server not reachable")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("server returned {}: {}", status, body);
        }

        resp.json().await.context("failed to parse health response")
    }

    /// Submit one input value. Returns the task id.
    pub async fn submit(&self, data: &str) -> Result<String> {
        if data.trim().is_empty() {
            bail!("task data must not be empty");
        }

        let url = format!("{}/tasks", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&SubmitBody { data })
            .send()
            .await
            .context("failed to submit task")?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("server returned {}: {}", status, body);
        }

        let reply: SubmitReply = resp.json().await.context("failed to parse submit response")?;
        Ok(reply.id)
    }

    /// Fetch a task's result. `None` while it has not completed.
    pub async fn result(&self, task_id: &str) -> Result<Option<TaskResult>> {
        let url = format!("{}/results/{}", self.base_url, task_id);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("failed to fetch result")?;

        match resp.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => resp
                .json()
                .await
                .map(Some)
                .context("failed to parse result response"),
            status => {
                let body = resp.text().await.unwrap_or_default();
                bail!("server returned {}: {}", status, body);
            }
        }
    }

    /// Poll until the result arrives or `timeout` elapses.
    pub async fn wait_for_result(
        &self,
        task_id: &str,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<TaskResult> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if let Some(result) = self.result(task_id).await? {
                return Ok(result);
            }
            if tokio::time::Instant::now() >= deadline {
                bail!("timed out after {:?} waiting for task {}", timeout, task_id);
            }
            tokio::time::sleep(poll_interval).await;
        }
    }
}
