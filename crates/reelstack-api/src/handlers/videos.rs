//! Composition handlers.
//!
//! Both endpoints run the job to completion inside the request. There is no
//! queue: a request holds its connection until the encoder finishes.

use std::path::PathBuf;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::Response;
use axum::Json;
use reelstack_models::{CompositionJob, CompositionRequest, CompositionResult, JobId};
use serde::Serialize;
use tokio_util::io::ReaderStream;
use tracing::info;
use url::Url;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// File name offered to clients downloading the composite.
pub const DOWNLOAD_FILE_NAME: &str = "reelstack_video.mp4";

/// Response of `POST /create-video-url`.
#[derive(Serialize)]
pub struct CreateVideoUrlResponse {
    pub success: bool,
    pub job_id: String,
    pub video_path: String,
    pub message: String,
}

/// Compose a video and stream it back as an attachment.
pub async fn create_video(
    State(state): State<AppState>,
    payload: Result<Json<CompositionRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let Json(request) = payload?;
    let (job_id, output) = run_job(&state, request).await?;

    let file = tokio::fs::File::open(&output)
        .await
        .map_err(|e| ApiError::internal(&state.config, format!("Failed to open output: {}", e)))?;
    let len = file
        .metadata()
        .await
        .map_err(|e| ApiError::internal(&state.config, format!("Failed to stat output: {}", e)))?
        .len();

    info!(job_id = %job_id, size_bytes = len, "Streaming composite to client");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(header::CONTENT_LENGTH, len)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_FILE_NAME),
        )
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ApiError::internal(&state.config, format!("Failed to build response: {}", e)))
}

/// Compose a video and return where it was written.
pub async fn create_video_url(
    State(state): State<AppState>,
    payload: Result<Json<CompositionRequest>, JsonRejection>,
) -> ApiResult<Json<CreateVideoUrlResponse>> {
    let Json(request) = payload?;
    let (job_id, output) = run_job(&state, request).await?;

    Ok(Json(CreateVideoUrlResponse {
        success: true,
        job_id: job_id.to_string(),
        video_path: output.display().to_string(),
        message: "Video created. Use /create-video to download it directly.".to_string(),
    }))
}

async fn run_job(state: &AppState, request: CompositionRequest) -> ApiResult<(JobId, PathBuf)> {
    let job = request.into_job()?;
    reject_local_urls(&job)?;

    match state.compositor.submit(job).await {
        CompositionResult::Succeeded {
            job_id,
            output_path,
        } => Ok((job_id, output_path)),
        CompositionResult::Failed { failure, .. } => Err(ApiError::Composition(failure)),
    }
}

/// HTTP clients may only reference remote assets.
fn reject_local_urls(job: &CompositionJob) -> ApiResult<()> {
    let urls = std::iter::once(&job.primary_source_url).chain(job.bottom_clip_urls.iter());
    for raw in urls {
        let is_remote = Url::parse(raw)
            .map(|u| matches!(u.scheme(), "http" | "https"))
            .unwrap_or(false);
        if !is_remote {
            return Err(ApiError::bad_request(format!(
                "only http(s) URLs are accepted, got '{}'",
                raw
            )));
        }
    }
    Ok(())
}
