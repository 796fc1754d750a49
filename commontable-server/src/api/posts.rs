use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use commontable_types::{CreatePostRequest, FeedSort, Post, VoteToggleResponse};

use super::auth::get_user_from_headers;
use super::{ApiError, ApiResult};
use crate::db::repositories::{ParticipationRepository, PostRepository, VoteRepository};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct GetPostsQuery {
    #[serde(default = "default_limit")]
    limit: i32,
    #[serde(default)]
    sort: Option<String>,
}

fn default_limit() -> i32 {
    20
}

/// GET /posts - The community feed: featured posts with the caller's
/// upvote state on each
pub async fn get_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<GetPostsQuery>,
) -> ApiResult<Json<Vec<Post>>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let sort = query
        .sort
        .as_deref()
        .and_then(FeedSort::parse)
        .unwrap_or_default();

    let posts = PostRepository::new(state.db.pool.clone())
        .featured_feed(&user_id, sort, query.limit)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(posts))
}

/// POST /posts - Create a new post (enters the feed once featured)
pub async fn create_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreatePostRequest>,
) -> ApiResult<Json<Post>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Post cannot be empty".to_string()));
    }
    if content.len() > 500 {
        return Err(ApiError::BadRequest(
            "Post cannot exceed 500 characters".to_string(),
        ));
    }

    let repo = PostRepository::new(state.db.pool.clone());
    let post = Post {
        id: Uuid::new_v4(),
        user_id,
        content: content.to_string(),
        image_url: payload.image_url,
        upvotes: 0,
        is_anonymous: payload.is_anonymous,
        is_featured: false,
        created_at: Utc::now(),
        user_has_upvoted: false,
    };
    repo.create(&post)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    let saved = repo
        .get_by_id(&post.id, &user_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .ok_or_else(|| ApiError::InternalError("Post not saved".to_string()))?;

    Ok(Json(saved))
}

/// POST /posts/:id/upvote - Toggle the caller's upvote on a post
///
/// The returned count comes from the database after the write, never from
/// client-side arithmetic.
pub async fn toggle_upvote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<Uuid>,
) -> ApiResult<Json<VoteToggleResponse>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    if PostRepository::new(state.db.pool.clone())
        .get_by_id(&post_id, &user_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
        .is_none()
    {
        return Err(ApiError::NotFound("Post not found".to_string()));
    }

    let outcome = VoteRepository::new(state.db.pool.clone())
        .toggle_post_upvote(&user_id, &post_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(VoteToggleResponse {
        target_id: post_id,
        voted: outcome.voted,
        count: outcome.count,
    }))
}

/// POST /responses/:id/vote - Toggle the caller's vote on a prompt response
pub async fn toggle_response_vote(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(response_id): Path<Uuid>,
) -> ApiResult<Json<VoteToggleResponse>> {
    let user_id = get_user_from_headers(&state, &headers)?;

    if !ParticipationRepository::new(state.db.pool.clone())
        .response_exists(&response_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?
    {
        return Err(ApiError::NotFound("Response not found".to_string()));
    }

    let outcome = VoteRepository::new(state.db.pool.clone())
        .toggle_response_vote(&user_id, &response_id)
        .map_err(|e| ApiError::InternalError(e.to_string()))?;

    Ok(Json(VoteToggleResponse {
        target_id: response_id,
        voted: outcome.voted,
        count: outcome.count,
    }))
}
