use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;

use commontable_types::{
    Cycle, CycleResponse, CycleStage, CycleStateResponse, SubmitAnswerRequest,
};

use super::auth::get_user_from_headers;
use super::{ApiError, ApiResult};
use crate::db::repositories::{CycleRepository, ParticipationRepository};
use crate::lifecycle::{countdown_message, resolve_stage};
use crate::state::AppState;

/// GET /cycles/active - The active cycle
///
/// 404 here is an empty state, not a failure; clients render it as
/// "no active cycle".
pub async fn get_active_cycle(State(state): State<AppState>) -> ApiResult<Json<Cycle>> {
    let cycle = require_active_cycle(&state)?;
    Ok(Json(cycle))
}

/// GET /cycles/state - The caller's lifecycle stage
///
/// The single source of routing truth: clients render whatever screen the
/// returned stage names and never re-derive it locally.
pub async fn get_cycle_state(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<CycleStateResponse>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let cycle = CycleRepository::new(state.db.pool.clone())
        .get_active()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let participation = ParticipationRepository::new(state.db.pool.clone());
    let now = Utc::now();

    let (seen, opted_in) = match &cycle {
        Some(cycle) => (
            participation
                .has_seen_prompt(&user_id, &cycle.id)
                .map_err(|e| ApiError::InternalError(e.to_string()))?,
            participation
                .is_opted_in(&user_id, &cycle.id)
                .map_err(|e| ApiError::InternalError(e.to_string()))?,
        ),
        None => (false, false),
    };

    let stage = resolve_stage(cycle.as_ref(), seen, opted_in, now);
    let countdown = match (stage, &cycle) {
        (CycleStage::OptedInPreEvent | CycleStage::OptedInPostEvent, Some(cycle)) => {
            Some(countdown_message(now, cycle.event_date))
        }
        _ => None,
    };

    Ok(Json(CycleStateResponse {
        stage,
        cycle,
        countdown,
    }))
}

/// POST /cycles/answer - Answer the active cycle's prompt
///
/// Answering is also opting in; the two are one transaction.
pub async fn submit_answer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<SubmitAnswerRequest>,
) -> ApiResult<Json<CycleResponse>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    if payload.answer.trim().is_empty() {
        return Err(ApiError::BadRequest("Answer cannot be empty".to_string()));
    }

    let cycle = require_active_cycle(&state)?;
    require_opt_in_open(&cycle)?;

    let participation = ParticipationRepository::new(state.db.pool.clone());
    if participation
        .get_response(&user_id, &cycle.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "You have already answered this cycle's prompt".to_string(),
        ));
    }

    participation
        .submit_answer(&user_id, &cycle.id, payload.answer.trim())
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let response = participation
        .get_response(&user_id, &cycle.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::InternalError("Response not saved".to_string()))?;

    Ok(Json(response))
}

/// POST /cycles/skip - Dismiss the prompt without answering
///
/// Marks the prompt seen so the user is not shown it again, without
/// opting them in.
pub async fn skip_prompt(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = get_user_from_headers(&state, &headers)?;
    let cycle = require_active_cycle(&state)?;

    ParticipationRepository::new(state.db.pool.clone())
        .mark_prompt_seen(&user_id, &cycle.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(serde_json::json!({ "skipped": true })))
}

/// POST /cycles/opt-in - Commit to attending the active cycle's dinner
pub async fn opt_in(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = get_user_from_headers(&state, &headers)?;
    let cycle = require_active_cycle(&state)?;
    require_opt_in_open(&cycle)?;

    ParticipationRepository::new(state.db.pool.clone())
        .opt_in(&user_id, &cycle.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!("User {} opted into cycle {}", user_id, cycle.id);
    Ok(Json(serde_json::json!({ "opted_in": true })))
}

/// DELETE /cycles/opt-in - Withdraw from the active cycle
///
/// A full reset: the opt-in, the prompt answer, and the seen marker all
/// go, so the user lands back on the prompt.
pub async fn opt_out(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = get_user_from_headers(&state, &headers)?;
    let cycle = require_active_cycle(&state)?;

    ParticipationRepository::new(state.db.pool.clone())
        .opt_out(&user_id, &cycle.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!("User {} opted out of cycle {}", user_id, cycle.id);
    Ok(Json(serde_json::json!({ "opted_in": false })))
}

fn require_active_cycle(state: &AppState) -> Result<Cycle, ApiError> {
    CycleRepository::new(state.db.pool.clone())
        .get_active()
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("No active cycle".to_string()))
}

/// Answering writes an opt-in row, so both entry points share the
/// deadline gate.
fn require_opt_in_open(cycle: &Cycle) -> Result<(), ApiError> {
    if Utc::now() > cycle.opt_in_deadline {
        return Err(ApiError::BadRequest(
            "The opt-in deadline for this cycle has passed".to_string(),
        ));
    }
    Ok(())
}
