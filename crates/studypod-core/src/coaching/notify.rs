//! Notification decisions.
//!
//! Decides whether something is worth pushing to a learner. Delivery is the
//! host's job; nothing here sends anything.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};

use super::{CoachingInsight, InsightKind, InsightTarget};
use crate::model::{CheckIn, UserProfile};
use crate::streak::{StreakState, StreakStatus};

/// A previously delivered notification, as recorded by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub kind: InsightKind,
    pub target: InsightTarget,
    pub notified_at: DateTime<Utc>,
}

/// Why a notification is held back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuppressReason {
    /// Same insight was pushed within the cooldown
    Cooldown,
    /// Learner already checked in today
    AlreadyCheckedIn,
    /// Reminder hour has not been reached in the learner's timezone
    TooEarly,
    /// No live streak to protect
    NoActiveStreak,
}

/// Whether to push an insight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum NotifyDecision {
    Notify,
    Suppress { reason: SuppressReason },
}

/// Cooldown-based notification policy.
#[derive(Debug, Clone)]
pub struct NotifyPolicy {
    cooldown: Duration,
}

impl NotifyPolicy {
    pub fn new(cooldown_hours: u32) -> Self {
        Self {
            cooldown: Duration::hours(cooldown_hours as i64),
        }
    }

    /// Notify unless the same kind and target went out within the cooldown.
    pub fn decide(
        &self,
        insight: &CoachingInsight,
        history: &[NotificationRecord],
        now: DateTime<Utc>,
    ) -> NotifyDecision {
        let recent = history.iter().any(|record| {
            record.kind == insight.kind
                && record.target == insight.target
                && now - record.notified_at < self.cooldown
        });
        if recent {
            NotifyDecision::Suppress {
                reason: SuppressReason::Cooldown,
            }
        } else {
            NotifyDecision::Notify
        }
    }
}

/// Outcome of the daily check-in reminder check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum ReminderDecision {
    Remind { streak: u32 },
    Skip { reason: SuppressReason },
}

/// Decide whether `profile` should get a "don't break your streak" nudge.
///
/// Fires once the learner's local clock is past `reminder_hour`, today's
/// check-in is still missing, and a streak is alive.
pub fn check_in_reminder(
    profile: &UserProfile,
    streak: &StreakState,
    check_ins: &[CheckIn],
    now: DateTime<Utc>,
    reminder_hour: u32,
) -> ReminderDecision {
    let today = profile.local_date(now);
    let skip = |reason| ReminderDecision::Skip { reason };

    if check_ins
        .iter()
        .any(|c| c.user_id == profile.id && c.date == today)
    {
        return skip(SuppressReason::AlreadyCheckedIn);
    }

    let local_hour = (now + Duration::minutes(profile.utc_offset_minutes as i64)).hour();
    if local_hour < reminder_hour {
        return skip(SuppressReason::TooEarly);
    }

    if streak.status != StreakStatus::Pending {
        return skip(SuppressReason::NoActiveStreak);
    }

    ReminderDecision::Remind {
        streak: streak.current,
    }
}
