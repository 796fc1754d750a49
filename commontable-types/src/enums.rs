use serde::{Deserialize, Serialize};

/// Where a user stands in the active cycle's lifecycle.
///
/// Resolved per user, per active cycle, from three facts: whether an active
/// cycle exists, whether the user has seen the prompt for it, and whether an
/// opt-in row exists. Clients route on this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStage {
    /// No cycle has is_active set. Terminal until an admin activates one.
    NoActiveCycle,
    /// Active cycle exists and the user has not yet seen its prompt.
    PromptUnanswered,
    /// Prompt was seen (answered or skipped) but no opt-in row exists.
    PromptAnsweredNotOptedIn,
    /// Opted in and the event has not started yet.
    OptedInPreEvent,
    /// Opted in and the event time has passed.
    OptedInPostEvent,
}

impl CycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStage::NoActiveCycle => "no_active_cycle",
            CycleStage::PromptUnanswered => "prompt_unanswered",
            CycleStage::PromptAnsweredNotOptedIn => "prompt_answered_not_opted_in",
            CycleStage::OptedInPreEvent => "opted_in_pre_event",
            CycleStage::OptedInPostEvent => "opted_in_post_event",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "no_active_cycle" => Some(CycleStage::NoActiveCycle),
            "prompt_unanswered" => Some(CycleStage::PromptUnanswered),
            "prompt_answered_not_opted_in" => Some(CycleStage::PromptAnsweredNotOptedIn),
            "opted_in_pre_event" => Some(CycleStage::OptedInPreEvent),
            "opted_in_post_event" => Some(CycleStage::OptedInPostEvent),
            _ => None,
        }
    }
}

/// Sort order for the community feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FeedSort {
    /// Most upvoted first (ties broken by recency). The feed default.
    #[default]
    Top,
    Newest,
}

impl FeedSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedSort::Top => "top",
            FeedSort::Newest => "newest",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "top" => Some(FeedSort::Top),
            "newest" => Some(FeedSort::Newest),
            _ => None,
        }
    }
}
