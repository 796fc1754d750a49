use axum::{extract::State, http::HeaderMap, Json};

use commontable_types::GroupAssignment;

use super::auth::get_user_from_headers;
use super::{ApiError, ApiResult};
use crate::db::repositories::{CycleRepository, GroupRepository};
use crate::state::AppState;

/// GET /groups/current - The caller's group for the active cycle
///
/// 404 means not matched yet (or no active cycle); clients show a
/// "matches pending" state rather than an error.
pub async fn get_current_group(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<GroupAssignment>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let cycle = CycleRepository::new(state.db.pool.clone())
        .get_active()
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("No active cycle".to_string()))?;

    let group_repo = GroupRepository::new(state.db.pool.clone());
    let group = group_repo
        .for_user_in_cycle(&user_id, &cycle.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("No group assignment yet".to_string()))?;

    let members = group_repo
        .members(&group.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(GroupAssignment {
        group,
        cycle,
        members,
    }))
}

/// GET /groups/history - Every group the caller has been matched into
pub async fn get_group_history(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<GroupAssignment>>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let group_repo = GroupRepository::new(state.db.pool.clone());
    let cycle_repo = CycleRepository::new(state.db.pool.clone());

    let groups = group_repo
        .history_for_user(&user_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let mut assignments = Vec::with_capacity(groups.len());
    for group in groups {
        let Some(cycle) = cycle_repo
            .get_by_id(&group.cycle_id)
            .map_err(|e| ApiError::InternalError(e.to_string()))?
        else {
            continue;
        };
        let members = group_repo
            .members(&group.id)
            .map_err(|e| ApiError::InternalError(e.to_string()))?;
        assignments.push(GroupAssignment {
            group,
            cycle,
            members,
        });
    }

    Ok(Json(assignments))
}
