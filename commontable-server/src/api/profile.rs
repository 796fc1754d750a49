use axum::{extract::State, http::HeaderMap, Json};

use commontable_types::{Profile, UpsertProfileRequest};

use super::auth::get_user_from_headers;
use super::{ApiError, ApiResult};
use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::state::AppState;

/// GET /profile - The caller's profile, empty-fielded if never saved
pub async fn get_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<Profile>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let profile = ProfileRepository::new(state.db.pool.clone())
        .get(&user_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    match profile {
        Some(profile) => Ok(Json(profile)),
        None => {
            // No saved profile yet: return an empty one rather than 404 so
            // clients can render a blank form
            let user = UserRepository::new(state.db.pool.clone())
                .get_by_id(&user_id)
                .map_err(|e| ApiError::InternalError(e.to_string()))?
                .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
            Ok(Json(Profile {
                user_id,
                name: String::new(),
                major: String::new(),
                year: String::new(),
                email: user.email,
            }))
        }
    }
}

/// PUT /profile - Save the caller's profile (insert or update)
pub async fn upsert_profile(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<UpsertProfileRequest>,
) -> ApiResult<Json<Profile>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    if payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Name is required".to_string()));
    }

    let user = UserRepository::new(state.db.pool.clone())
        .get_by_id(&user_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let profile = Profile {
        user_id,
        name: payload.name.trim().to_string(),
        major: payload.major.trim().to_string(),
        year: payload.year.trim().to_string(),
        email: user.email,
    };

    ProfileRepository::new(state.db.pool.clone())
        .upsert(&profile)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(profile))
}
