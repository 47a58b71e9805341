//! HTTP handlers for job submission and status polling.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use super::workers::JobRequest;
use crate::jobs::{Job, JobStore};
use crate::pipeline::staging;

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub store: JobStore,
    pub queue: tokio::sync::mpsc::Sender<JobRequest>,
    pub publish_dir: PathBuf,
}

pub type SharedState = Arc<AppState>;

// ── Request payload types ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct GenerateVideoRequest {
    #[serde(default)]
    pub prompt: Option<String>,
}

// ── Error handling ────────────────────────────────────────────────────

/// Structured error payloads: the client always sees
/// `{"status":"error","message":...}`, never a stack trace.
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Busy(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Busy(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
        };
        (
            status,
            Json(json!({"status": "error", "message": message})),
        )
            .into_response()
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/generate-video", post(generate_video))
        .route("/job-status/{job_id}", get(job_status))
        .route("/health", get(health_check))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn health_check() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

/// Accept a prompt, clear the previously published asset, create the job
/// record, and enqueue it. The job id comes back immediately; the caller
/// polls `/job-status/{job_id}` for the terminal result.
async fn generate_video(
    State(state): State<SharedState>,
    Json(req): Json<GenerateVideoRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let prompt = req
        .prompt
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Prompt is required".to_string()))?;

    if let Err(e) = staging::clear_published(&state.publish_dir).await {
        warn!(error = %e, "failed to clear published assets");
    }

    // Reserve the queue slot before creating the record so a rejected
    // submission never leaves a stuck processing entry behind.
    let permit = state
        .queue
        .try_reserve()
        .map_err(|_| ApiError::Busy("Job queue is full, retry later".to_string()))?;

    let job_id = Uuid::new_v4().to_string();
    state.store.create(&job_id, "Video generation started");
    permit.send(JobRequest {
        job_id: job_id.clone(),
        prompt,
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "message": "Video generation job started",
            "job_id": job_id,
        })),
    ))
}

async fn job_status(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
) -> Result<Json<Job>, ApiError> {
    state
        .store
        .get(&job_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    /// Router with no workers attached: jobs stay processing, which makes
    /// the submission/polling assertions deterministic. The receiver is
    /// returned so the queue stays open.
    fn test_app(
        capacity: usize,
    ) -> (
        Router,
        tokio::sync::mpsc::Receiver<JobRequest>,
        tempfile::TempDir,
    ) {
        let publish_dir = tempfile::tempdir().unwrap();
        let (tx, rx) = tokio::sync::mpsc::channel(capacity);
        let state = Arc::new(AppState {
            store: JobStore::new(),
            queue: tx,
            publish_dir: publish_dir.path().to_path_buf(),
        });
        (api_router().with_state(state), rx, publish_dir)
    }

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let (app, _rx, _dir) = test_app(4);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn missing_prompt_is_rejected() {
        let (app, _rx, _dir) = test_app(4);
        let resp = app
            .oneshot(post_json("/generate-video", json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert!(!body["message"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_prompt_is_rejected() {
        let (app, _rx, _dir) = test_app(4);
        let resp = app
            .oneshot(post_json("/generate-video", json!({"prompt": "   "})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn submission_returns_a_pollable_job_id() {
        let (app, mut rx, _dir) = test_app(4);

        let resp = app
            .clone()
            .oneshot(post_json("/generate-video", json!({"prompt": "draw y = x^2"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "accepted");
        let job_id = body["job_id"].as_str().unwrap().to_string();

        // The prompt landed on the queue.
        let queued = rx.recv().await.unwrap();
        assert_eq!(queued.job_id, job_id);
        assert_eq!(queued.prompt, "draw y = x^2");

        // The record is immediately pollable and still processing.
        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/job-status/{job_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "processing");
        assert_eq!(body["message"], "Video generation started");
        assert!(body.get("video_path").is_none());
    }

    #[tokio::test]
    async fn submission_clears_previously_published_assets() {
        let (app, _rx, dir) = test_app(4);
        let stale = dir.path().join(staging::PUBLISHED_NAME);
        tokio::fs::write(&stale, b"old").await.unwrap();

        app.oneshot(post_json("/generate-video", json!({"prompt": "hi"})))
            .await
            .unwrap();
        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn unknown_job_is_a_structured_404() {
        let (app, _rx, _dir) = test_app(4);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/job-status/unknown-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body = body_json(resp).await;
        assert_eq!(body["status"], "error");
        assert_eq!(body["message"], "Job not found");
    }

    #[tokio::test]
    async fn full_queue_rejects_with_503_and_no_stuck_record() {
        let (app, _rx, _dir) = test_app(1);

        let first = app
            .clone()
            .oneshot(post_json("/generate-video", json!({"prompt": "one"})))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::ACCEPTED);

        let second = app
            .clone()
            .oneshot(post_json("/generate-video", json!({"prompt": "two"})))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(second).await;
        assert_eq!(body["status"], "error");
    }
}
