use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::CycleStage;

// Custom serde module for DateTime to ensure RFC3339 string format
mod datetime_format {
    use chrono::{DateTime, Utc};
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = date.to_rfc3339();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse::<DateTime<Utc>>().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub is_admin: bool,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    pub is_test_user: bool,
}

/// 1:1 with a user, upserted on save. Absent until the user fills it in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Uuid,
    pub name: String,
    pub major: String,
    pub year: String,
    pub email: String,
}

/// A recurring dinner event with its conversation prompt.
///
/// At most one cycle is active at a time; every activation path deactivates
/// all others first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cycle {
    pub id: Uuid,
    pub title: String,
    pub prompt: String,
    #[serde(with = "datetime_format")]
    pub event_date: DateTime<Utc>,
    #[serde(with = "datetime_format")]
    pub opt_in_deadline: DateTime<Utc>,
    pub is_active: bool,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// A user's committed intent to attend a cycle's dinner.
/// Row existence is the sole signal of "attending".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptIn {
    pub user_id: Uuid,
    pub cycle_id: Uuid,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

/// A user's free-text answer to a cycle's prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub cycle_id: Uuid,
    pub answer: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    /// Vote count, derived from response_votes rows.
    #[serde(default)]
    pub votes: i32,
    /// Whether the calling user has voted for this response.
    #[serde(default)]
    pub user_has_voted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    pub upvotes: i32,
    pub is_anonymous: bool,
    pub is_featured: bool,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
    /// Whether the calling user has upvoted this post.
    #[serde(default)]
    pub user_has_upvoted: bool,
}

/// A matched dinner group for a cycle. Written by the external matching
/// process; read-only to this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: Uuid,
    pub cycle_id: Uuid,
    pub location: String,
    #[serde(with = "datetime_format")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub major: String,
    pub year: String,
}

// Request/Response types for API

#[derive(Debug, Serialize, Deserialize)]
pub struct SignUpRequest {
    pub name: String,
    pub email: String,
    pub major: String,
    pub year: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub session_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePostRequest {
    pub content: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpsertProfileRequest {
    pub name: String,
    pub major: String,
    pub year: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCycleRequest {
    pub title: String,
    pub prompt: String,
    #[serde(with = "datetime_format")]
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub opt_in_deadline: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetCycleActiveRequest {
    pub active: bool,
}

/// The routing decision of the lifecycle controller, as data.
#[derive(Debug, Serialize, Deserialize)]
pub struct CycleStateResponse {
    pub stage: CycleStage,
    pub cycle: Option<Cycle>,
    /// Rendered countdown to event time, present while opted in:
    /// "0d 1h 30m" pre-event, "Match time has arrived!" once the
    /// event starts.
    #[serde(default)]
    pub countdown: Option<String>,
}

/// Confirmed result of a vote toggle. The count is recomputed from
/// persisted rows, never adjusted optimistically.
#[derive(Debug, Serialize, Deserialize)]
pub struct VoteToggleResponse {
    pub target_id: Uuid,
    pub voted: bool,
    pub count: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub group: Group,
    pub cycle: Cycle,
    pub members: Vec<GroupMember>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CycleStats {
    pub opt_in_count: i32,
    pub response_count: i32,
    pub group_count: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub details: Option<String>,
}

/// One per-field message from form validation, surfaced inline by clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub fields: Vec<FieldError>,
}
