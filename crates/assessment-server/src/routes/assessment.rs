//! Assessment routes: `/api/assessment/*`
//!
//! The five endpoints a client drives: registration, OTP verification,
//! step fetch, step submission, and the session summary. Every failure is a
//! JSON `{"error": "..."}` body.

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower::limit::ConcurrencyLimitLayer;

use assessment_core::api::{
    Registration, SessionSummary, StartResponse, StepPayload, SubmitResponse, VerifyOtpRequest,
    VerifyOtpResponse,
};
use assessment_core::form::FormData;
use assessment_core::types::{SessionId, StepNumber};

use crate::error::AppError;
use crate::session::SessionError;
use crate::state::AppState;

/// Build the `/api/assessment` router.
///
/// Paths:
/// - `POST /start/`: register and issue an OTP
/// - `POST /verify-otp/`: check the OTP
/// - `GET  /questions/{step}/?session_id=`: step definition and saved answers
/// - `POST /submit/`: save a step
/// - `GET  /session/?session_id=`: progress and scores
pub fn router(start_concurrency: usize) -> Router<Arc<AppState>> {
    let start_routes = Router::new()
        .route("/start/", post(start))
        .layer(ConcurrencyLimitLayer::new(start_concurrency));

    Router::new()
        .merge(start_routes)
        .route("/verify-otp/", post(verify_otp))
        .route("/questions/{step}/", get(questions))
        .route("/submit/", post(submit))
        .route("/session/", get(session_summary))
}

// ── Request types ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: Option<String>,
}

/// Body of `POST /submit/`. The step is taken as a plain number so that an
/// out-of-range value yields "Invalid step" rather than a decode error.
#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub session_id: SessionId,
    pub step: u32,
    #[serde(default)]
    pub form_data: FormData,
}

// ── Handlers ─────────────────────────────────────────────────────────

async fn start(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Registration>, JsonRejection>,
) -> Result<Json<StartResponse>, AppError> {
    let registration = json_body(payload)?;
    let issued = state.sessions.register(registration.clone()).await?;

    state
        .delivery
        .deliver(&issued.session_id, &registration, &issued.otp);

    Ok(Json(StartResponse {
        session_id: issued.session_id,
        otp_expires_in: Some(issued.expires_in.as_secs()),
        message: Some("OTP sent".to_owned()),
    }))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyOtpRequest>, JsonRejection>,
) -> Result<Json<VerifyOtpResponse>, AppError> {
    let request = json_body(payload)?;
    let advance = state
        .sessions
        .verify_otp(&request.session_id, request.otp.trim())
        .await?;

    Ok(Json(VerifyOtpResponse {
        verified: Some(true),
        current_step: Some(advance.current_step.into()),
        progress_percent: Some(advance.progress.into()),
    }))
}

async fn questions(
    State(state): State<Arc<AppState>>,
    Path(step): Path<String>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Json<StepPayload>, AppError> {
    let step = parse_step(&step)?;
    let session_id = session_param(query)?;

    let (name, saved) = state.sessions.saved_answers(&session_id, step).await?;
    let definition = state
        .catalog
        .definition(step, &name)
        .ok_or(SessionError::InvalidStep)?;

    Ok(Json(StepPayload::from_definition(definition, saved)))
}

async fn submit(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<Json<SubmitResponse>, AppError> {
    let body = json_body(payload)?;
    let step = StepNumber::new(body.step)
        .filter(|s| !s.is_complete())
        .ok_or(SessionError::InvalidStep)?;

    // Required keys do not depend on the personalised title.
    let definition = state
        .catalog
        .definition(step, "")
        .ok_or(SessionError::InvalidStep)?;

    let advance = state
        .sessions
        .submit(&body.session_id, step, &definition, &body.form_data)
        .await?;

    Ok(Json(SubmitResponse {
        current_step: advance.current_step.into(),
        progress_percent: advance.progress.into(),
    }))
}

async fn session_summary(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SessionQuery>, QueryRejection>,
) -> Result<Json<SessionSummary>, AppError> {
    let session_id = session_param(query)?;
    Ok(Json(state.sessions.summary(&session_id).await?))
}

// ── Helpers ──────────────────────────────────────────────────────────

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn session_param(query: Result<Query<SessionQuery>, QueryRejection>) -> Result<SessionId, AppError> {
    query
        .ok()
        .and_then(|Query(q)| q.session_id)
        .filter(|id| !id.trim().is_empty())
        .map(SessionId::new)
        .ok_or_else(|| AppError::BadRequest("session_id is required".to_owned()))
}

fn parse_step(raw: &str) -> Result<StepNumber, AppError> {
    raw.parse::<u32>()
        .ok()
        .and_then(StepNumber::new)
        .filter(|s| !s.is_complete())
        .ok_or_else(|| SessionError::InvalidStep.into())
}
