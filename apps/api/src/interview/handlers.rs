use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::Local;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::document::{extract_pdf, DocumentError, ExtractedDocument};
use crate::errors::AppError;
use crate::export::{export_pdf, export_text};
use crate::interview::{
    evaluate_answer, generate_questions, summarize_document, EvaluateInput, GenerateInput,
};
use crate::llm_client::{RecordingProgress, RetryEvent};
use crate::session::store::SessionHandle;
use crate::session::transcript::TIMESTAMP_FORMAT;
use crate::session::{Acquire, TranscriptEntry};
use crate::state::AppState;

const UPLOAD_FIELD: &str = "file";
const EXPORT_FILE_STEM: &str = "interview_history";

async fn session_handle(state: &AppState, id: Uuid) -> Result<SessionHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<SessionCreated>) {
    let session_id = state.sessions.create().await;
    (StatusCode::CREATED, Json(SessionCreated { session_id }))
}

/// DELETE /api/v1/sessions/:session_id
pub async fn handle_end_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if state.sessions.remove(id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("Session {id} not found")))
    }
}

/// GET /api/v1/sessions/:session_id/rate-limit
pub async fn handle_rate_limit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Acquire>, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    Ok(Json(session.limiter.try_acquire()))
}

#[derive(Serialize)]
pub struct DocumentResponse {
    pub summary: String,
    pub pages_read: usize,
    pub truncated: bool,
    pub cached: bool,
    pub retry_events: Vec<RetryEvent>,
}

/// POST /api/v1/sessions/:session_id/document
pub async fn handle_upload_document(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<DocumentResponse>, AppError> {
    let handle = session_handle(&state, id).await?;

    let mut upload: Option<Bytes> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?
    {
        if field.name() == Some(UPLOAD_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Malformed upload: {e}")))?;
            upload = Some(bytes);
        }
    }
    let bytes = upload.ok_or_else(|| {
        AppError::Validation(format!("Missing multipart field `{UPLOAD_FIELD}`"))
    })?;
    info!("Session {id}: received document ({} bytes)", bytes.len());

    let document: ExtractedDocument = tokio::task::spawn_blocking(move || extract_pdf(&bytes))
        .await
        .map_err(|e| DocumentError::Unreadable(e.to_string()))??;

    let mut session = handle.lock().await;
    let progress = RecordingProgress::new();
    let completion = summarize_document(&mut session, &state.llm, &document.text, &progress).await?;

    Ok(Json(DocumentResponse {
        summary: completion.text,
        pages_read: document.pages_read,
        truncated: document.truncated,
        cached: completion.cached,
        retry_events: progress.into_events(),
    }))
}

#[derive(Serialize)]
pub struct GenerateResponse {
    pub round_index: usize,
    pub questions: String,
    pub cached: bool,
    pub retry_events: Vec<RetryEvent>,
}

/// POST /api/v1/sessions/:session_id/generate
pub async fn handle_generate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<GenerateInput>,
) -> Result<Json<GenerateResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let progress = RecordingProgress::new();
    let round = generate_questions(&mut session, &state.llm, &req, &progress).await?;

    Ok(Json(GenerateResponse {
        round_index: round.round_index,
        questions: round.completion.text,
        cached: round.completion.cached,
        retry_events: progress.into_events(),
    }))
}

#[derive(Serialize)]
pub struct EvaluateResponse {
    pub feedback: String,
    pub recorded_in: Option<usize>,
    pub cached: bool,
    pub retry_events: Vec<RetryEvent>,
}

/// POST /api/v1/sessions/:session_id/evaluate
pub async fn handle_evaluate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<EvaluateInput>,
) -> Result<Json<EvaluateResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let mut session = handle.lock().await;
    let progress = RecordingProgress::new();
    let evaluation = evaluate_answer(&mut session, &state.llm, &req, &progress).await?;

    Ok(Json(EvaluateResponse {
        feedback: evaluation.completion.text,
        recorded_in: evaluation.recorded_in,
        cached: evaluation.completion.cached,
        retry_events: progress.into_events(),
    }))
}

#[derive(Serialize)]
pub struct RoundView {
    pub index: usize,
    #[serde(flatten)]
    pub entry: TranscriptEntry,
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub total: usize,
    pub current_round: Option<usize>,
    pub rounds: Vec<RoundView>,
}

/// GET /api/v1/sessions/:session_id/history
pub async fn handle_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<HistoryResponse>, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    let rounds = session
        .transcript
        .all_rounds()
        .iter()
        .cloned()
        .enumerate()
        .map(|(index, entry)| RoundView { index, entry })
        .collect();

    Ok(Json(HistoryResponse {
        total: session.transcript.all_rounds().len(),
        current_round: session.current_round,
        rounds,
    }))
}

/// GET /api/v1/sessions/:session_id/history/:round
pub async fn handle_load_round(
    State(state): State<AppState>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<Json<RoundView>, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    let entry = session
        .transcript
        .round(index)
        .cloned()
        .ok_or_else(|| AppError::NotFound(format!("Round {index} not found")))?;
    Ok(Json(RoundView { index, entry }))
}

/// DELETE /api/v1/sessions/:session_id/history
pub async fn handle_clear_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = session_handle(&state, id).await?;
    handle.lock().await.clear_history();
    info!("Session {id}: history cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:session_id/reset
pub async fn handle_reset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let handle = session_handle(&state, id).await?;
    handle.lock().await.reset_form();
    Ok(StatusCode::NO_CONTENT)
}

fn attachment(content_type: &'static str, extension: &str, body: Vec<u8>) -> Response {
    let filename = format!(
        "{EXPORT_FILE_STEM}_{}.{extension}",
        Local::now().format("%Y%m%d_%H%M%S")
    );
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}

/// GET /api/v1/sessions/:session_id/export/text
pub async fn handle_export_text(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    let generated_at = Local::now().format(TIMESTAMP_FORMAT).to_string();

    Ok(
        match export_text(session.transcript.all_rounds(), &generated_at) {
            Some(text) => attachment("text/plain; charset=utf-8", "txt", text.into_bytes()),
            None => StatusCode::NO_CONTENT.into_response(),
        },
    )
}

/// GET /api/v1/sessions/:session_id/export/pdf
pub async fn handle_export_pdf(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let handle = session_handle(&state, id).await?;
    let session = handle.lock().await;
    let generated_at = Local::now().format(TIMESTAMP_FORMAT).to_string();

    Ok(
        match export_pdf(session.transcript.all_rounds(), &generated_at)? {
            Some(bytes) => attachment("application/pdf", "pdf", bytes),
            None => StatusCode::NO_CONTENT.into_response(),
        },
    )
}
