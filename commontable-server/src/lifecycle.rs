//! The cycle lifecycle controller.
//!
//! Every signed-in user is in exactly one stage at any moment, derived
//! from three facts: whether a cycle is active, whether the user has seen
//! its prompt, and whether they are opted in. The stage decides which
//! screen the client routes to; clients never compute it themselves.

use std::fmt;

use chrono::{DateTime, Utc};
use commontable_types::{Cycle, CycleStage};

/// Shown in place of a countdown once the event time has passed.
pub const MATCH_TIME_MESSAGE: &str = "Match time has arrived!";

/// Derive the user's current stage.
///
/// `seen_prompt` and `opted_in` must refer to the active cycle passed in;
/// markers from earlier cycles never apply because they are keyed by
/// cycle id.
pub fn resolve_stage(
    active_cycle: Option<&Cycle>,
    seen_prompt: bool,
    opted_in: bool,
    now: DateTime<Utc>,
) -> CycleStage {
    let Some(cycle) = active_cycle else {
        return CycleStage::NoActiveCycle;
    };

    if opted_in {
        if now < cycle.event_date {
            CycleStage::OptedInPreEvent
        } else {
            CycleStage::OptedInPostEvent
        }
    } else if seen_prompt {
        CycleStage::PromptAnsweredNotOptedIn
    } else {
        CycleStage::PromptUnanswered
    }
}

/// Time remaining until an event, broken into display units.
///
/// Days are uncapped; hours, minutes and seconds are remainders, so
/// 90 minutes out renders as "0d 1h 30m".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Countdown {
    pub days: i64,
    pub hours: i64,
    pub minutes: i64,
    pub seconds: i64,
}

impl Countdown {
    /// Compute the countdown from `now` to `target`, or `None` once the
    /// target has arrived.
    pub fn until(now: DateTime<Utc>, target: DateTime<Utc>) -> Option<Self> {
        let remaining = target - now;
        let total_seconds = remaining.num_seconds();
        if total_seconds <= 0 {
            return None;
        }

        Some(Self {
            days: total_seconds / 86_400,
            hours: (total_seconds % 86_400) / 3_600,
            minutes: (total_seconds % 3_600) / 60,
            seconds: total_seconds % 60,
        })
    }
}

impl fmt::Display for Countdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d {}h {}m", self.days, self.hours, self.minutes)
    }
}

/// Render the countdown string the client shows pre-event, or the
/// terminal message once the event starts.
pub fn countdown_message(now: DateTime<Utc>, event_date: DateTime<Utc>) -> String {
    match Countdown::until(now, event_date) {
        Some(countdown) => countdown.to_string(),
        None => MATCH_TIME_MESSAGE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn cycle(event_date: DateTime<Utc>) -> Cycle {
        Cycle {
            id: Uuid::new_v4(),
            title: "Thursday Dinner".to_string(),
            prompt: "If you could have dinner with any historical figure, who?".to_string(),
            event_date,
            opt_in_deadline: event_date - Duration::days(2),
            is_active: true,
            created_at: event_date - Duration::days(14),
        }
    }

    #[test]
    fn test_no_active_cycle_wins_regardless_of_flags() {
        let now = Utc::now();
        assert_eq!(
            resolve_stage(None, true, true, now),
            CycleStage::NoActiveCycle
        );
        assert_eq!(
            resolve_stage(None, false, false, now),
            CycleStage::NoActiveCycle
        );
    }

    #[test]
    fn test_stage_matrix_for_active_cycle() {
        let now = Utc::now();
        let upcoming = cycle(now + Duration::days(3));

        assert_eq!(
            resolve_stage(Some(&upcoming), false, false, now),
            CycleStage::PromptUnanswered
        );
        assert_eq!(
            resolve_stage(Some(&upcoming), true, false, now),
            CycleStage::PromptAnsweredNotOptedIn
        );
        assert_eq!(
            resolve_stage(Some(&upcoming), true, true, now),
            CycleStage::OptedInPreEvent
        );
    }

    #[test]
    fn test_opted_in_crosses_to_post_event_at_event_time() {
        let now = Utc::now();
        let started = cycle(now - Duration::minutes(1));
        assert_eq!(
            resolve_stage(Some(&started), true, true, now),
            CycleStage::OptedInPostEvent
        );

        // Exactly at event time counts as started
        let exact = cycle(now);
        assert_eq!(
            resolve_stage(Some(&exact), true, true, now),
            CycleStage::OptedInPostEvent
        );
    }

    #[test]
    fn test_opt_in_without_seen_marker_still_counts() {
        // Opt-in implies participation even if the seen marker was lost
        let now = Utc::now();
        let upcoming = cycle(now + Duration::days(3));
        assert_eq!(
            resolve_stage(Some(&upcoming), false, true, now),
            CycleStage::OptedInPreEvent
        );
    }

    #[test]
    fn test_countdown_ninety_minutes_out() {
        let now = Utc::now();
        let countdown = Countdown::until(now, now + Duration::minutes(90))
            .expect("future target should have a countdown");
        assert_eq!(countdown.to_string(), "0d 1h 30m");
        assert_eq!(countdown.seconds, 0);
    }

    #[test]
    fn test_countdown_units_are_remainders() {
        let now = Utc::now();
        let target = now + Duration::days(2) + Duration::hours(5) + Duration::minutes(7)
            + Duration::seconds(9);
        let countdown = Countdown::until(now, target).unwrap();
        assert_eq!(countdown.days, 2);
        assert_eq!(countdown.hours, 5);
        assert_eq!(countdown.minutes, 7);
        assert_eq!(countdown.seconds, 9);
        assert_eq!(countdown.to_string(), "2d 5h 7m");
    }

    #[test]
    fn test_countdown_none_once_event_arrives() {
        let now = Utc::now();
        assert!(Countdown::until(now, now).is_none());
        assert!(Countdown::until(now, now - Duration::seconds(1)).is_none());
        assert!(Countdown::until(now, now - Duration::days(30)).is_none());
    }

    #[test]
    fn test_countdown_message_terminal_value() {
        let now = Utc::now();
        assert_eq!(
            countdown_message(now, now - Duration::hours(1)),
            MATCH_TIME_MESSAGE
        );
        assert_eq!(
            countdown_message(now, now + Duration::minutes(90)),
            "0d 1h 30m"
        );
    }
}
