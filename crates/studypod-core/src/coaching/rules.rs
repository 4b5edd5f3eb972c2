//! Built-in coaching rules.

use std::collections::BTreeMap;

use super::{CoachingInsight, CoachingRule, Evidence, InsightKind, RuleContext};
use crate::review::{median, MoodDistribution, WeekKey};

/// Warns a pod whose participation fell two finalized weeks in a row.
#[derive(Debug, Clone, Copy, Default)]
pub struct DropOffRule;

impl CoachingRule for DropOffRule {
    fn kind(&self) -> InsightKind {
        InsightKind::WarnDropOff
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<CoachingInsight> {
        let recent = ctx.pod_reviews.len().checked_sub(3).map(|i| &ctx.pod_reviews[i..])?;
        let declining = recent
            .windows(2)
            .all(|pair| pair[1].participation_rate < pair[0].participation_rate);
        if !declining {
            return None;
        }

        let evidence = recent
            .iter()
            .map(|r| Evidence::Participation {
                week: r.week,
                rate: r.participation_rate,
            })
            .collect();
        let first = recent[0].participation_rate;
        let last = recent[recent.len() - 1].participation_rate;

        Some(CoachingInsight {
            kind: self.kind(),
            target: ctx.pod_target(),
            evidence,
            message: format!(
                "Pod participation has dropped two weeks running ({:.0}% to {:.0}%). A quick check-in with the group could help.",
                first * 100.0,
                last * 100.0
            ),
            generated_at: ctx.generated_at,
        })
    }
}

/// Celebrates a streak landing exactly on a milestone.
#[derive(Debug, Clone)]
pub struct MilestoneRule {
    milestones: Vec<u32>,
}

impl MilestoneRule {
    pub fn new(milestones: Vec<u32>) -> Self {
        Self { milestones }
    }
}

impl CoachingRule for MilestoneRule {
    fn kind(&self) -> InsightKind {
        InsightKind::Encourage
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<CoachingInsight> {
        let current = ctx.streak.current;
        if current == 0 || !ctx.streak.is_alive() || !self.milestones.contains(&current) {
            return None;
        }

        Some(CoachingInsight {
            kind: self.kind(),
            target: ctx.user_target(),
            evidence: vec![Evidence::Streak { current }],
            message: format!("{current}-day streak! Keep the momentum going."),
            generated_at: ctx.generated_at,
        })
    }
}

/// Suggests a schedule change when a learner mostly struggles and studies
/// less than the pod's median member.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleRule {
    struggling_share: f64,
}

impl ScheduleRule {
    pub fn new(struggling_share: f64) -> Self {
        Self { struggling_share }
    }
}

impl CoachingRule for ScheduleRule {
    fn kind(&self) -> InsightKind {
        InsightKind::SuggestSchedule
    }

    fn evaluate(&self, ctx: &RuleContext<'_>) -> Option<CoachingInsight> {
        let mut mood = MoodDistribution::default();
        for review in &ctx.user_reviews {
            mood.merge(&review.mood);
        }
        let share = mood.struggling_share();
        if mood.total() == 0 || share <= self.struggling_share {
            return None;
        }

        let mut totals: BTreeMap<&str, u32> = BTreeMap::new();
        for review in &ctx.pod_reviews {
            for (member, minutes) in &review.member_minutes {
                let entry = totals.entry(member.as_str()).or_insert(0);
                *entry = entry.saturating_add(*minutes);
            }
        }
        if totals.is_empty() {
            return None;
        }
        let user_minutes = totals.get(ctx.user_id).copied().unwrap_or(0);
        let pod_median = median(totals.values().copied().collect());
        if user_minutes as f64 >= pod_median {
            return None;
        }

        let weeks: Vec<WeekKey> = ctx.user_reviews.iter().map(|r| r.week).collect();
        Some(CoachingInsight {
            kind: self.kind(),
            target: ctx.user_target(),
            evidence: vec![
                Evidence::MoodShare {
                    weeks,
                    struggling_share: share,
                },
                Evidence::Minutes {
                    user_minutes,
                    pod_median_minutes: pod_median,
                },
            ],
            message: "Study sessions have felt like a struggle lately. Try shorter, regular sessions at a fixed time of day.".to_string(),
            generated_at: ctx.generated_at,
        })
    }
}
