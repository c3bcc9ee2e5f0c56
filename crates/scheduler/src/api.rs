//! HTTP submission API.
//!
//! - `POST /tasks` submits one input value and returns the new task id.
//! - `GET /results/{id}` returns the stored result for a task.
//! - `GET /health` and `GET /metrics` report scheduler status.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;
use crate::metrics::MetricsSnapshot;
use crate::state::SchedulerState;
use crate::task::TaskId;

// ── Request / response types ─────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub data: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResultResponse {
    pub task_id: String,
    pub result: String,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub workers: usize,
    pub queued: usize,
    pub results: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

// ── Router ───────────────────────────────────────────────────────

/// Build the API router over the shared scheduler state.
pub fn router(state: Arc<SchedulerState>) -> Router {
    Router::new()
        .route("/tasks", post(submit_task))
        .route("/results/{id}", get(get_result))
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .with_state(state)
}

// ── Handlers ─────────────────────────────────────────────────────

async fn submit_task(
    State(state): State<Arc<SchedulerState>>,
    Json(body): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), ApiError> {
    match state.submit(body.data).await {
        Ok(id) => Ok((
            StatusCode::CREATED,
            Json(SubmitResponse {
                id: id.into_inner(),
            }),
        )),
        Err(SchedulerError::InvalidSubmission(msg)) => Err(api_error(StatusCode::BAD_REQUEST, msg)),
        Err(e) => Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())),
    }
}

async fn get_result(
    State(state): State<Arc<SchedulerState>>,
    Path(id): Path<String>,
) -> Result<Json<ResultResponse>, ApiError> {
    let task_id = TaskId::from(id);
    let entry = state.results.get_entry(&task_id).await.ok_or_else(|| {
        api_error(
            StatusCode::NOT_FOUND,
            format!("no result for task '{task_id}'"),
        )
    })?;
    Ok(Json(ResultResponse {
        task_id: task_id.into_inner(),
        result: entry.value,
        completed_at: entry.completed_at,
    }))
}

async fn health(State(state): State<Arc<SchedulerState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        workers: state.registry.len().await,
        queued: state.queue.len().await,
        results: state.results.len().await,
    })
}

async fn metrics(State(state): State<Arc<SchedulerState>>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}
