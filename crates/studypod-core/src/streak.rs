//! Grace-aware daily streaks.
//!
//! A streak counts consecutive calendar days with at least one accepted
//! check-in. A missed day can be bridged by grace: at most
//! `grace_allowance` bridged days inside any rolling `grace_window_days`
//! span. The streak ends at the most recent miss that grace cannot cover.
//!
//! Streak state is always recomputed from the check-in history; nothing
//! here is stored or mutated between calls.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::model::CheckIn;

/// Which check-ins feed a learner's streak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakScope {
    /// Only check-ins in the pod being viewed
    PerPod,
    /// Any accepted check-in in any pod
    AllPods,
}

/// Configuration for streak calculation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StreakConfig {
    /// Missed days that may be bridged inside one rolling window
    pub grace_allowance: u32,
    /// Length of the rolling grace window in days
    pub grace_window_days: u32,
    pub scope: StreakScope,
}

impl Default for StreakConfig {
    fn default() -> Self {
        Self {
            grace_allowance: 1,
            grace_window_days: 7,
            scope: StreakScope::PerPod,
        }
    }
}

/// Where the current streak stands relative to "today".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreakStatus {
    /// No check-ins at all
    None,
    /// Checked in today
    Active,
    /// Streak alive but today's check-in is still outstanding
    Pending,
    /// History exists but the current streak is zero
    Broken,
}

/// Derived streak view for one learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakState {
    pub current: u32,
    pub longest: u32,
    pub last_check_in: Option<NaiveDate>,
    /// Whether the live streak survived at least one missed day
    pub grace_consumed: bool,
    /// Missed days bridged inside the live streak
    pub grace_days: Vec<NaiveDate>,
    /// Misses that could still be bridged as of today
    pub grace_remaining: u32,
    pub status: StreakStatus,
}

impl StreakState {
    fn empty(grace_allowance: u32) -> Self {
        Self {
            current: 0,
            longest: 0,
            last_check_in: None,
            grace_consumed: false,
            grace_days: Vec::new(),
            grace_remaining: grace_allowance,
            status: StreakStatus::None,
        }
    }

    /// Whether the streak is still alive.
    pub fn is_alive(&self) -> bool {
        matches!(self.status, StreakStatus::Active | StreakStatus::Pending)
    }
}

/// Streak calculator.
#[derive(Debug, Clone, Default)]
pub struct StreakCalculator {
    config: StreakConfig,
}

impl StreakCalculator {
    /// Create a new calculator with default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom config
    pub fn with_config(config: StreakConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StreakConfig {
        &self.config
    }

    /// Compute the streak for one learner's check-ins.
    ///
    /// With [`StreakScope::PerPod`] and a `pod_id`, check-ins from other
    /// pods are ignored. Input order does not matter.
    pub fn compute(&self, check_ins: &[CheckIn], pod_id: Option<&str>, today: NaiveDate) -> StreakState {
        let dates: BTreeSet<NaiveDate> = check_ins
            .iter()
            .filter(|c| match (self.config.scope, pod_id) {
                (StreakScope::PerPod, Some(pod)) => c.pod_id == pod,
                _ => true,
            })
            .map(|c| c.date)
            .collect();
        self.compute_from_dates(&dates, today)
    }

    /// Compute the streak from a set of distinct check-in dates.
    ///
    /// Dates after `today` are ignored. The walk runs backward from today,
    /// or from yesterday when today has no check-in yet, so an unfinished
    /// day never counts as a miss. A miss is bridged while grace allows it
    /// and the walk stops at the first miss grace cannot cover. Bridged
    /// days count only once an earlier check-in is reached.
    pub fn compute_from_dates(&self, dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> StreakState {
        let dates: BTreeSet<NaiveDate> = dates.range(..=today).copied().collect();
        let (Some(&first), Some(&last)) = (dates.first(), dates.last()) else {
            return StreakState::empty(self.config.grace_allowance);
        };

        let checked_today = last == today;
        let anchor = if checked_today {
            today
        } else {
            today.pred_opt().unwrap_or(today)
        };

        let mut current = 0u32;
        let mut grace_days: Vec<NaiveDate> = Vec::new();
        // Bridged misses not yet backed by an older check-in
        let mut pending: Vec<NaiveDate> = Vec::new();
        let mut day = anchor;
        while day >= first {
            if dates.contains(&day) {
                current += 1;
                grace_days.append(&mut pending);
            } else if self.grace_allows(day, grace_days.iter().chain(&pending)) {
                pending.push(day);
            } else {
                break;
            }
            day = match day.pred_opt() {
                Some(prev) => prev,
                None => break,
            };
        }
        grace_days.sort_unstable();

        let longest = longest_consecutive_run(&dates).max(current);
        let status = if current == 0 {
            StreakStatus::Broken
        } else if checked_today {
            StreakStatus::Active
        } else {
            StreakStatus::Pending
        };
        let used_near_today = self.grace_used_near(today, &grace_days);

        StreakState {
            current,
            longest,
            last_check_in: Some(last),
            grace_consumed: !grace_days.is_empty(),
            grace_days,
            grace_remaining: self.config.grace_allowance.saturating_sub(used_near_today),
            status,
        }
    }

    fn grace_allows<'a>(&self, day: NaiveDate, used: impl IntoIterator<Item = &'a NaiveDate>) -> bool {
        self.grace_used_near(day, used) < self.config.grace_allowance
    }

    fn grace_used_near<'a>(&self, day: NaiveDate, used: impl IntoIterator<Item = &'a NaiveDate>) -> u32 {
        let window = i64::from(self.config.grace_window_days);
        used.into_iter()
            .filter(|g| (day - **g).num_days().abs() < window)
            .count() as u32
    }
}

/// Longest run of strictly consecutive dates, ignoring grace.
fn longest_consecutive_run(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0u32;
    let mut run = 0u32;
    let mut prev: Option<NaiveDate> = None;
    for &date in dates {
        run = match prev {
            Some(p) if p.succ_opt() == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        prev = Some(date);
    }
    longest
}
