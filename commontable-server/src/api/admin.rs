use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use chrono::{Duration, Utc};
use uuid::Uuid;

use commontable_types::{CreateCycleRequest, Cycle, CycleStats, SetCycleActiveRequest};

use super::auth::get_user_from_headers;
use super::{ApiError, ApiResult};
use crate::db::repositories::{CycleRepository, UserRepository};
use crate::state::AppState;

/// Default gap between the opt-in deadline and the event when the request
/// doesn't set one explicitly.
const DEFAULT_DEADLINE_HOURS: i64 = 48;

/// Resolve the caller and require the admin flag
fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let user_id = get_user_from_headers(state, headers)?;

    let user = UserRepository::new(state.db.pool.clone())
        .get_by_id(&user_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    if !user.is_admin {
        return Err(ApiError::Forbidden("Admin access required".to_string()));
    }
    Ok(user_id)
}

/// GET /admin/cycles - All cycles, newest first
pub async fn list_cycles(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<Cycle>>> {
    require_admin(&state, &headers)?;

    let cycles = CycleRepository::new(state.db.pool.clone())
        .list_all()
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(cycles))
}

/// POST /admin/cycles - Create a cycle and activate it
///
/// Creation always activates: the new cycle replaces whatever was active,
/// so the at-most-one-active invariant holds without a separate step.
pub async fn create_cycle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCycleRequest>,
) -> ApiResult<Json<Cycle>> {
    require_admin(&state, &headers)?;

    if payload.title.trim().is_empty() {
        return Err(ApiError::BadRequest("Title is required".to_string()));
    }
    if payload.prompt.trim().is_empty() {
        return Err(ApiError::BadRequest("Prompt is required".to_string()));
    }

    let opt_in_deadline = match &payload.opt_in_deadline {
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::BadRequest("Invalid opt-in deadline".to_string()))?,
        None => payload.event_date - Duration::hours(DEFAULT_DEADLINE_HOURS),
    };

    let cycle = Cycle {
        id: Uuid::new_v4(),
        title: payload.title.trim().to_string(),
        prompt: payload.prompt.trim().to_string(),
        event_date: payload.event_date,
        opt_in_deadline,
        is_active: true,
        created_at: Utc::now(),
    };

    CycleRepository::new(state.db.pool.clone())
        .create_active(&cycle)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!("Admin created cycle {} ({})", cycle.title, cycle.id);
    Ok(Json(cycle))
}

/// POST /admin/cycles/test - Create a short test cycle
///
/// The event is two hours out so the countdown and post-event transition
/// can be exercised within a working session.
pub async fn create_test_cycle(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Cycle>> {
    require_admin(&state, &headers)?;

    let now = Utc::now();
    let cycle = Cycle {
        id: Uuid::new_v4(),
        title: "Test Cycle".to_string(),
        prompt: "If you could have dinner with any historical figure, who would it be and why?"
            .to_string(),
        event_date: now + Duration::hours(2),
        opt_in_deadline: now + Duration::hours(1),
        is_active: true,
        created_at: now,
    };

    CycleRepository::new(state.db.pool.clone())
        .create_active(&cycle)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!("Admin created test cycle {}", cycle.id);
    Ok(Json(cycle))
}

/// PUT /admin/cycles/:id/active - Activate or deactivate a cycle
pub async fn set_cycle_active(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cycle_id): Path<Uuid>,
    Json(payload): Json<SetCycleActiveRequest>,
) -> ApiResult<Json<Cycle>> {
    require_admin(&state, &headers)?;

    let repo = CycleRepository::new(state.db.pool.clone());
    if repo
        .get_by_id(&cycle_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::NotFound("Cycle not found".to_string()));
    }

    repo.set_active(&cycle_id, payload.active)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let cycle = repo
        .get_by_id(&cycle_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("Cycle not found".to_string()))?;

    Ok(Json(cycle))
}

/// DELETE /admin/cycles/:id - Delete a cycle and all its participation data
pub async fn delete_cycle(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cycle_id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    require_admin(&state, &headers)?;

    let repo = CycleRepository::new(state.db.pool.clone());
    if repo
        .get_by_id(&cycle_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::NotFound("Cycle not found".to_string()));
    }

    repo.delete(&cycle_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!("Admin deleted cycle {}", cycle_id);
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// GET /admin/cycles/:id/stats - Participation counts for a cycle
pub async fn cycle_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(cycle_id): Path<Uuid>,
) -> ApiResult<Json<CycleStats>> {
    require_admin(&state, &headers)?;

    let repo = CycleRepository::new(state.db.pool.clone());
    if repo
        .get_by_id(&cycle_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::NotFound("Cycle not found".to_string()));
    }

    let stats = repo
        .stats(&cycle_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;
    Ok(Json(stats))
}
