//! Rule-based coaching insights.
//!
//! Each rule looks at a learner's streak and recent weekly reviews and
//! either produces one [`CoachingInsight`] or nothing. The engine runs every
//! rule and returns all insights that fired; ranking them is left to the
//! consumer. Only finalized reviews feed the rules, so provisional numbers
//! from the running week never trigger advice.

mod notify;
mod rules;

pub use notify::{
    check_in_reminder, NotificationRecord, NotifyDecision, NotifyPolicy, ReminderDecision,
    SuppressReason,
};
pub use rules::{DropOffRule, MilestoneRule, ScheduleRule};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{PodId, UserId};
use crate::review::{WeekKey, WeeklyReview};
use crate::streak::StreakState;

/// Kind of advisory message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsightKind {
    Encourage,
    WarnDropOff,
    SuggestSchedule,
}

impl InsightKind {
    pub fn code(&self) -> &'static str {
        match self {
            InsightKind::Encourage => "encourage",
            InsightKind::WarnDropOff => "warn-drop-off",
            InsightKind::SuggestSchedule => "suggest-schedule",
        }
    }
}

/// Who an insight is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InsightTarget {
    User { user_id: UserId },
    Pod { pod_id: PodId },
}

/// Aggregate values that made a rule fire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Evidence {
    Streak { current: u32 },
    Participation { week: WeekKey, rate: f64 },
    MoodShare { weeks: Vec<WeekKey>, struggling_share: f64 },
    Minutes { user_minutes: u32, pod_median_minutes: f64 },
}

/// A generated advisory message. Not authoritative data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoachingInsight {
    pub kind: InsightKind,
    pub target: InsightTarget,
    pub evidence: Vec<Evidence>,
    pub message: String,
    pub generated_at: DateTime<Utc>,
}

/// Configuration for coaching rules and notification decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingConfig {
    /// Number of finalized weeks the rules look back over
    pub window_weeks: u32,
    /// Streak lengths that earn an encouragement
    pub milestones: Vec<u32>,
    /// Struggling share above which mood counts as predominantly struggling
    pub struggling_share: f64,
    /// Minimum hours between two notifications of the same insight
    pub notify_cooldown_hours: u32,
    /// Local hour after which a missing check-in triggers a reminder
    pub reminder_hour: u32,
}

impl Default for CoachingConfig {
    fn default() -> Self {
        Self {
            window_weeks: 3,
            milestones: vec![7, 30, 100],
            struggling_share: 0.5,
            notify_cooldown_hours: 24,
            reminder_hour: 20,
        }
    }
}

/// Raw input for one coaching evaluation.
#[derive(Debug, Clone, Copy)]
pub struct CoachingInput<'a> {
    pub user_id: &'a str,
    pub pod_id: &'a str,
    pub streak: &'a StreakState,
    /// The learner's own weekly reviews, any order
    pub user_reviews: &'a [WeeklyReview],
    /// The pod's weekly reviews, any order
    pub pod_reviews: &'a [WeeklyReview],
    pub generated_at: DateTime<Utc>,
}

/// Windowed view handed to each rule: finalized reviews only, oldest
/// first, at most `window_weeks` of each.
#[derive(Debug, Clone)]
pub struct RuleContext<'a> {
    pub user_id: &'a str,
    pub pod_id: &'a str,
    pub streak: &'a StreakState,
    pub user_reviews: Vec<&'a WeeklyReview>,
    pub pod_reviews: Vec<&'a WeeklyReview>,
    pub generated_at: DateTime<Utc>,
}

impl RuleContext<'_> {
    pub fn user_target(&self) -> InsightTarget {
        InsightTarget::User {
            user_id: self.user_id.to_string(),
        }
    }

    pub fn pod_target(&self) -> InsightTarget {
        InsightTarget::Pod {
            pod_id: self.pod_id.to_string(),
        }
    }
}

/// A single, independently evaluable coaching rule.
pub trait CoachingRule: Send + Sync {
    fn kind(&self) -> InsightKind;

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<CoachingInsight>;
}

/// Runs every configured rule and collects what fires.
pub struct CoachingEngine {
    config: CoachingConfig,
    rules: Vec<Box<dyn CoachingRule>>,
}

impl CoachingEngine {
    /// Engine with the default config and built-in rules.
    pub fn new() -> Self {
        Self::with_config(CoachingConfig::default())
    }

    /// Engine with the built-in rules configured by `config`.
    pub fn with_config(config: CoachingConfig) -> Self {
        let rules: Vec<Box<dyn CoachingRule>> = vec![
            Box::new(DropOffRule),
            Box::new(MilestoneRule::new(config.milestones.clone())),
            Box::new(ScheduleRule::new(config.struggling_share)),
        ];
        Self { config, rules }
    }

    /// Engine with an explicit rule list.
    pub fn with_rules(config: CoachingConfig, rules: Vec<Box<dyn CoachingRule>>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &CoachingConfig {
        &self.config
    }

    /// Evaluate all rules. Output is sorted by kind then target, so the
    /// order rules are registered in never changes the result.
    pub fn evaluate(&self, input: &CoachingInput<'_>) -> Vec<CoachingInsight> {
        let ctx = RuleContext {
            user_id: input.user_id,
            pod_id: input.pod_id,
            streak: input.streak,
            user_reviews: finalized_window(input.user_reviews, self.config.window_weeks),
            pod_reviews: finalized_window(input.pod_reviews, self.config.window_weeks),
            generated_at: input.generated_at,
        };

        let mut insights: Vec<CoachingInsight> =
            self.rules.iter().filter_map(|rule| rule.evaluate(&ctx)).collect();
        insights.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.target.cmp(&b.target)));

        debug!(
            user_id = %input.user_id,
            pod_id = %input.pod_id,
            fired = insights.len(),
            "evaluated coaching rules"
        );
        insights
    }
}

impl Default for CoachingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn finalized_window(reviews: &[WeeklyReview], weeks: u32) -> Vec<&WeeklyReview> {
    let mut finalized: Vec<&WeeklyReview> = reviews.iter().filter(|r| r.finalized).collect();
    finalized.sort_by_key(|r| r.week);
    let skip = finalized.len().saturating_sub(weeks as usize);
    finalized.split_off(skip)
}
