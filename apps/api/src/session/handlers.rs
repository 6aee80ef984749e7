//! Axum route handlers for the tuning wizard.

use axum::{
    extract::{Multipart, Path, State},
    http::header,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::{ingest, CandidateFile, UploadSource};
use crate::render::{render_document, ExportOptions};
use crate::session::store::{run_tuning, SharedSession};
use crate::session::{AppStatus, SessionView};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct JobDescriptionRequest {
    pub job_description: String,
}

async fn lookup(state: &AppState, id: Uuid) -> Result<SharedSession, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(State(state): State<AppState>) -> Json<SessionView> {
    let session = state.sessions.create().await;
    let view = session.lock().await.view();
    Json(view)
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let view = session.lock().await.view();
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/resume
///
/// Multipart body: `file` (the PDF) and optional `source` (`picker` | `drop`).
/// A rejected file leaves the session untouched.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;

    let mut candidate: Option<CandidateFile> = None;
    let mut source = UploadSource::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().map(String::from);
                let content_type = field.content_type().map(String::from);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {e}")))?;
                candidate = Some(CandidateFile {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            "source" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
                source = text.parse()?;
            }
            _ => {}
        }
    }

    let candidate =
        candidate.ok_or_else(|| AppError::Validation("Missing 'file' field".to_string()))?;
    let ingested = ingest(candidate, source, state.config.max_upload_bytes)?;

    let mut guard = session.lock().await;
    guard.select_file(ingested.handle, ingested.data_url)?;
    Ok(Json(guard.view()))
}

/// PUT /api/v1/sessions/:id/job-description
pub async fn handle_set_job_description(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<JobDescriptionRequest>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut guard = session.lock().await;
    guard.set_job_description(request.job_description)?;
    Ok(Json(guard.view()))
}

/// POST /api/v1/sessions/:id/tune
///
/// Blocks until the backend answers. Backend failures are reported as a session in
/// the `ERROR` status, not as an HTTP error. The request completes even if this
/// connection goes away first.
pub async fn handle_tune(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let view = run_tuning(session, state.tuner.clone()).await?;
    Ok(Json(view))
}

/// POST /api/v1/sessions/:id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let session = lookup(&state, id).await?;
    let mut guard = session.lock().await;
    guard.reset();
    info!("Session {id} reset");
    Ok(Json(guard.view()))
}

/// GET /api/v1/sessions/:id/document
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Html<String>, AppError> {
    let session = lookup(&state, id).await?;
    let guard = session.lock().await;
    if guard.status() != AppStatus::Success {
        return Err(AppError::Conflict(format!(
            "No tuned resume available while the session is {:?}",
            guard.status()
        )));
    }
    Ok(Html(render_document(guard.result())))
}

/// POST /api/v1/sessions/:id/export
///
/// Returns the PDF as a download. The session stays in `SUCCESS` whatever happens.
pub async fn handle_export(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let session = lookup(&state, id).await?;
    let ticket = session.lock().await.begin_export()?;
    let document = render_document(&ticket.html);

    let result = state
        .exporter
        .export(&document, &state.export_options)
        .await;
    session.lock().await.finish_export(&ticket);

    let pdf = result?;
    let disposition = format!(
        "attachment; filename=\"{}\"",
        state.export_options.filename
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    )
        .into_response())
}

/// GET /api/v1/export-options
///
/// The fixed export configuration, for clients that render the PDF themselves.
pub async fn handle_export_options(State(state): State<AppState>) -> Json<ExportOptions> {
    Json(state.export_options.clone())
}
