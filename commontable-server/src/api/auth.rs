use axum::{extract::State, http::HeaderMap, Json};
use chrono::Utc;
use uuid::Uuid;

use commontable_types::{AuthResponse, Profile, SignInRequest, SignUpRequest, User};
use serde::Serialize;

use super::{ApiError, ApiResult};
use crate::db::repositories::{ProfileRepository, UserRepository};
use crate::state::AppState;
use crate::validation::{validate_signin, validate_signup};

const BCRYPT_COST: u32 = 10;

/// Response for session validation
#[derive(Serialize)]
pub struct ValidateSessionResponse {
    pub user: User,
    pub valid: bool,
}

/// Extract user ID from session token header
pub fn get_user_from_headers(state: &AppState, headers: &HeaderMap) -> Result<Uuid, ApiError> {
    let token = headers
        .get("X-Session-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    state
        .get_authenticated_user_id_from_token(token)
        .ok_or_else(|| ApiError::Unauthorized("Invalid session token".to_string()))
}

/// POST /auth/signup - Create an account with a campus email
///
/// Validation runs before anything is written; a rejected signup leaves
/// no user or profile row behind.
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let errors = validate_signup(&payload, &state.email_domain);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user_repo = UserRepository::new(state.db.pool.clone());
    let email = payload.email.trim().to_lowercase();

    if user_repo
        .get_by_email(&email)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "An account with this email already exists".to_string(),
        ));
    }

    let password_hash = bcrypt::hash(&payload.password, BCRYPT_COST)
        .map_err(|e| ApiError::InternalError(format!("Failed to hash password: {}", e)))?;

    let user = User {
        id: Uuid::new_v4(),
        email: email.clone(),
        is_admin: false,
        created_at: Utc::now(),
        is_test_user: false,
    };
    user_repo
        .create(&user, &password_hash)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let profile = Profile {
        user_id: user.id,
        name: payload.name.trim().to_string(),
        major: payload.major.trim().to_string(),
        year: payload.year.trim().to_string(),
        email,
    };
    ProfileRepository::new(state.db.pool.clone())
        .upsert(&profile)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let session_token = state
        .session_manager
        .create_session(user.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    tracing::info!("New signup: {}", user.id);

    Ok(Json(AuthResponse {
        user,
        session_token,
    }))
}

/// POST /auth/signin - Sign in with email and password
///
/// Wrong email and wrong password return the same message so the endpoint
/// cannot be used to probe which addresses have accounts.
pub async fn signin(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let errors = validate_signin(&payload.email, &payload.password);
    if !errors.is_empty() {
        return Err(ApiError::Validation(errors));
    }

    let user_repo = UserRepository::new(state.db.pool.clone());
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let hash = user_repo
        .get_password_hash(payload.email.trim())
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(invalid)?;

    let verified = bcrypt::verify(&payload.password, &hash)
        .map_err(|e| ApiError::InternalError(format!("Failed to verify password: {}", e)))?;
    if !verified {
        return Err(invalid());
    }

    let user = user_repo
        .get_by_email(payload.email.trim())
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(invalid)?;

    let session_token = state
        .session_manager
        .create_session(user.id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(AuthResponse {
        user,
        session_token,
    }))
}

/// POST /auth/logout - Delete the caller's session
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    let token = headers
        .get("X-Session-Token")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthorized("Missing session token".to_string()))?;

    state
        .session_manager
        .delete_session(token)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

/// GET /auth/validate - Validate session token
pub async fn validate_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<ValidateSessionResponse>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let repo = UserRepository::new(state.db.pool.clone());
    let user = repo
        .get_by_id(&user_id)
        .map_err(|e| ApiError::InternalError(format!("Failed to get user: {}", e)))?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ValidateSessionResponse { user, valid: true }))
}
