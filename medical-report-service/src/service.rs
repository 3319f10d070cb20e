use axum::{
    Form, Router,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    middleware::from_fn,
    response::{Html, IntoResponse, Json, Redirect, Response},
    routing::{get, post, put},
};
use consult_flow::{
    ConsultError, ConsultSession, Consultation, GenerationOracle, InMemorySessionStorage,
    Orchestrator, Report, Role, RunStatus, SessionStorage,
};
use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::{sync::Arc, time::Duration};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use crate::{
    models::{ConsultForm, ConsultRequest, ConsultResponse, SessionResponse, UploadReportRequest},
    telemetry::correlation_id_middleware,
    ui,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn status_for(error: &ConsultError) -> StatusCode {
    match error {
        ConsultError::InvalidRole(_) => StatusCode::BAD_REQUEST,
        ConsultError::MissingInput(_) => StatusCode::CONFLICT,
        ConsultError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        ConsultError::OracleError(_) => StatusCode::BAD_GATEWAY,
        ConsultError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn api_error(error: &ConsultError) -> ApiError {
    let message = match error {
        ConsultError::InvalidRole(_) => "Invalid role",
        ConsultError::MissingInput(_) => "Missing input",
        ConsultError::SessionNotFound(_) => "Session not found",
        ConsultError::OracleError(_) => "Text generation failed",
        ConsultError::StorageError(_) => "Session storage failed",
    };
    (
        status_for(error),
        Json(json!({
            "error": message,
            "details": error.to_string()
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub session_storage: Arc<dyn SessionStorage>,
    pub orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(oracle: Arc<dyn GenerationOracle>) -> Self {
        Self {
            session_storage: Arc::new(InMemorySessionStorage::new()),
            orchestrator: Orchestrator::new(oracle),
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/upload", post(upload_report_file))
        .route("/session/{session_id}", get(session_page))
        .route("/session/{session_id}/consult", post(consult_from_form))
        .route("/health", get(health_check))
        .route("/api", get(api_root))
        .route("/api/sessions", post(create_session))
        .route(
            "/api/sessions/{session_id}",
            get(get_session_status).delete(delete_session),
        )
        .route("/api/sessions/{session_id}/report", put(upload_report))
        .route("/api/sessions/{session_id}/consult", post(consult))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn load_session(state: &AppState, session_id: &str) -> Result<ConsultSession, ConsultError> {
    state
        .session_storage
        .get(session_id)
        .await?
        .ok_or_else(|| ConsultError::SessionNotFound(session_id.to_string()))
}

async fn save_session(state: &AppState, mut session: ConsultSession) -> Result<(), ConsultError> {
    let session_id = session.id.clone();
    session.touch();
    state.session_storage.save(session).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Failed to save session");
        e
    })
}

/// Apply `update` to the stored session, but only while it still holds `report`.
///
/// A report replaced during generation wins: the run's status and result
/// belong to the old report and are dropped.
async fn record_run<F>(
    state: &AppState,
    session_id: &str,
    report: &Report,
    update: F,
) -> Result<ConsultSession, ConsultError>
where
    F: FnOnce(&mut ConsultSession),
{
    let mut session = load_session(state, session_id).await?;
    if session.report.as_ref() != Some(report) {
        warn!(session_id = %session_id, "Report replaced during consultation, discarding result");
        return Ok(session);
    }

    update(&mut session);
    save_session(state, session.clone()).await?;
    Ok(session)
}

/// Run one consultation for a session and record its lifecycle.
///
/// The role is validated before anything else happens; a session without a
/// report fails with `MissingInput` and leaves the session untouched.
async fn run_consultation(
    state: &AppState,
    session_id: &str,
    role_name: &str,
) -> Result<(ConsultSession, Consultation), ConsultError> {
    let role: Role = role_name.parse()?;
    let session = load_session(state, session_id).await?;

    let report = session.report.clone().ok_or_else(|| {
        ConsultError::MissingInput(ui::UPLOAD_WARNING.to_string())
    })?;

    record_run(state, session_id, &report, |session| {
        session.status = RunStatus::Running;
    })
    .await?;

    info!(session_id = %session_id, role = %role, "Starting consultation");

    let outcome = state.orchestrator.consult(role, Some(&report)).await;
    let session = record_run(state, session_id, &report, |session| match &outcome {
        Ok(consultation) => {
            session.status = RunStatus::Done;
            session.last = Some(consultation.clone());
        }
        Err(e) => session.status = RunStatus::Failed(e.to_string()),
    })
    .await?;

    outcome.map(|consultation| (session, consultation))
}

/// Drop sessions idle for longer than `ttl`.
pub async fn purge_idle_sessions(
    storage: &dyn SessionStorage,
    ttl: Duration,
) -> Result<usize, ConsultError> {
    let Some(cutoff) = TimeDelta::from_std(ttl)
        .ok()
        .and_then(|ttl| Utc::now().checked_sub_signed(ttl))
    else {
        return Ok(0);
    };
    storage.purge_idle(cutoff).await
}

/// Periodically purge idle sessions for the lifetime of the process.
pub fn spawn_session_sweeper(
    storage: Arc<dyn SessionStorage>,
    ttl: Duration,
) -> tokio::task::JoinHandle<()> {
    let period = ttl.clamp(Duration::from_secs(1), Duration::from_secs(60));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match purge_idle_sessions(storage.as_ref(), ttl).await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "Purged idle sessions"),
                Err(e) => warn!(error = %e, "Failed to purge idle sessions"),
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Browser pages
// ---------------------------------------------------------------------------

async fn index() -> Html<String> {
    Html(ui::upload_page(None))
}

async fn read_uploaded_report(mut multipart: Multipart) -> Result<Report, String> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Malformed upload: {}", e))?
    {
        if field.name() != Some("report") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !file_name.to_ascii_lowercase().ends_with(".txt") {
            return Err("Upload a .txt file".to_string());
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read upload: {}", e))?;
        let text = String::from_utf8(bytes.to_vec())
            .map_err(|_| "The uploaded file is not valid UTF-8 text".to_string())?;
        let report = Report::new(text);
        if report.is_blank() {
            return Err("Report cannot be empty".to_string());
        }
        return Ok(report);
    }

    Err("No file uploaded".to_string())
}

async fn upload_report_file(State(state): State<AppState>, multipart: Multipart) -> Response {
    let report = match read_uploaded_report(multipart).await {
        Ok(report) => report,
        Err(message) => {
            warn!("Rejected upload: {}", message);
            return (StatusCode::BAD_REQUEST, Html(ui::upload_page(Some(&message)))).into_response();
        }
    };

    let session = ConsultSession::with_report(report);
    let session_id = session.id.clone();
    if let Err(e) = save_session(&state, session).await {
        return (status_for(&e), Html(ui::upload_page(Some(&e.to_string())))).into_response();
    }

    info!(session_id = %session_id, "Medical report uploaded");
    Redirect::to(&format!("/session/{}", session_id)).into_response()
}

#[derive(Debug, Deserialize)]
struct SelectQuery {
    role: Option<String>,
}

async fn session_page(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Query(query): Query<SelectQuery>,
) -> Response {
    let session = match load_session(&state, &session_id).await {
        Ok(session) => session,
        Err(ConsultError::SessionNotFound(_)) => {
            return (StatusCode::NOT_FOUND, Html(ui::not_found_page(&session_id))).into_response();
        }
        Err(e) => {
            return (status_for(&e), Html(ui::upload_page(Some(&e.to_string())))).into_response();
        }
    };

    match query.role.as_deref().map(str::parse::<Role>).transpose() {
        Ok(selected) => Html(ui::session_page(&session, selected, None)).into_response(),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Html(ui::session_page(&session, None, Some(&e.to_string()))),
        )
            .into_response(),
    }
}

async fn consult_from_form(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Form(form): Form<ConsultForm>,
) -> Response {
    match run_consultation(&state, &session_id, &form.role).await {
        Ok((session, consultation)) => {
            Html(ui::session_page(&session, Some(consultation.role), None)).into_response()
        }
        Err(ConsultError::SessionNotFound(_)) => {
            (StatusCode::NOT_FOUND, Html(ui::not_found_page(&session_id))).into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            match load_session(&state, &session_id).await {
                Ok(session) => {
                    let selected = form.role.parse::<Role>().ok();
                    (status, Html(ui::session_page(&session, selected, Some(&e.to_string()))))
                        .into_response()
                }
                Err(_) => (status, Html(ui::upload_page(Some(&e.to_string())))).into_response(),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JSON API
// ---------------------------------------------------------------------------

async fn api_root() -> Json<Value> {
    Json(json!({
        "service": "Medical Report Analyzer",
        "version": "1.0.0",
        "description": "Role-based analysis of uploaded medical reports by specialist and multidisciplinary agents",
        "roles": Role::ALL,
        "endpoints": {
            "GET /": "Browser UI",
            "POST /api/sessions": "Create an empty session",
            "PUT /api/sessions/{session_id}/report": "Upload the medical report text",
            "POST /api/sessions/{session_id}/consult": "Run one agent over the report",
            "GET /api/sessions/{session_id}": "Get session status and last result",
            "DELETE /api/sessions/{session_id}": "Discard the session and its report",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<Value> {
    let session = ConsultSession::new();
    let session_id = session.id.clone();

    save_session(&state, session)
        .await
        .map_err(|e| api_error(&e))?;

    info!(session_id = %session_id, "Session created");
    Ok(Json(json!({
        "session_id": session_id,
        "status": "created",
        "message": "Upload a medical report to continue"
    })))
}

async fn upload_report(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<UploadReportRequest>,
) -> ApiResult<Value> {
    let report = Report::new(request.report);
    if report.is_blank() {
        return Err(bad_request_error("Report cannot be empty"));
    }

    let mut session = load_session(&state, &session_id)
        .await
        .map_err(|e| api_error(&e))?;
    session.set_report(report);
    save_session(&state, session)
        .await
        .map_err(|e| api_error(&e))?;

    info!(session_id = %session_id, "Medical report uploaded");
    Ok(Json(json!({
        "session_id": session_id,
        "status": "uploaded",
        "message": ui::UPLOAD_SUCCESS
    })))
}

async fn get_session_status(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id)
        .await
        .map_err(|e| api_error(&e))?;
    Ok(Json(SessionResponse::from(&session)))
}

async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    load_session(&state, &session_id)
        .await
        .map_err(|e| api_error(&e))?;
    state
        .session_storage
        .delete(&session_id)
        .await
        .map_err(|e| api_error(&e))?;

    info!(session_id = %session_id, "Session deleted");
    Ok(Json(json!({
        "session_id": session_id,
        "status": "deleted"
    })))
}

async fn consult(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ConsultRequest>,
) -> ApiResult<ConsultResponse> {
    match run_consultation(&state, &session_id, &request.role).await {
        Ok((_, consultation)) => Ok(Json(ConsultResponse::new(&session_id, consultation))),
        Err(e) => {
            error!(session_id = %session_id, role = %request.role, error = %e, "Consultation request failed");
            Err(api_error(&e))
        }
    }
}
