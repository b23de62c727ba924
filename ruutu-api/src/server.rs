//! HTTP routes for the highscore service.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use ruutu_core::{HighscoreRecord, ScoreSubmission};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, instrument, warn};

use crate::error::{ApiError, ErrorModel};
use crate::store::HighscoreStore;

// =============================================================================
// State
// =============================================================================

pub struct AppStateInner {
    store: HighscoreStore,
    retain: usize,
}

pub type AppState = Arc<AppStateInner>;

// =============================================================================
// JSON Models
// =============================================================================

/// Response to an accepted submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub ok: bool,
    pub top: Vec<HighscoreRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthModel {
    pub status: String,
}

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorModel>)>;

/// Current time as an RFC 3339 UTC timestamp with milliseconds.
pub fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// =============================================================================
// API Endpoints
// =============================================================================

#[instrument(skip_all)]
async fn list_highscores(State(state): State<AppState>) -> ApiResult<Vec<HighscoreRecord>> {
    let records = state.store.top(state.retain).map_err(|e| {
        warn!(error = %e, "Failed to read highscores");
        ApiError::from(e)
    })?;
    debug!(count = records.len(), "Listed highscores");
    Ok(Json(records))
}

#[instrument(skip_all)]
async fn submit_highscore(
    State(state): State<AppState>,
    payload: Result<Json<ScoreSubmission>, JsonRejection>,
) -> ApiResult<SubmitResponse> {
    let Json(submission) = payload.map_err(|rejection| {
        debug!(reason = %rejection.body_text(), "Rejected payload");
        ApiError::InvalidPayload
    })?;

    // The line list is the authority; the claimed score must agree with it.
    if !submission.is_consistent() {
        warn!(
            claimed = submission.score,
            canonical = submission.canonical_score(),
            "Score mismatch"
        );
        return Err(ApiError::ScoreMismatch.into());
    }

    let record = HighscoreRecord {
        score: submission.score,
        date: timestamp(),
    };
    let top = state.store.insert(&record, state.retain).map_err(|e| {
        warn!(error = %e, "Failed to store highscore");
        ApiError::from(e)
    })?;
    info!(score = record.score, "Highscore stored");
    Ok(Json(SubmitResponse { ok: true, top }))
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Router
// =============================================================================

/// Build the service router around a store.
pub fn app(store: HighscoreStore, retain: usize) -> Router {
    let state: AppState = Arc::new(AppStateInner { store, retain });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/highscores", get(list_highscores).post(submit_highscore))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}
