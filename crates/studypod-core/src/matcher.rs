//! Pod matching for new learners.
//!
//! Candidates must share the learner's level, cover the learner's exam date
//! (within a tolerance) and have a free seat. Among those, pods whose
//! members sit closest to the learner's exam date rank first. When nothing
//! qualifies the matcher proposes a new pod instead of forcing a poor fit.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::{JlptLevel, PodId, UserProfile};
use crate::pod::{Pod, MAX_POD_CAPACITY, MIN_POD_CAPACITY};

/// Optional learner preferences that narrow the candidate set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchPreferences {
    /// Only consider pods no larger than this
    pub max_pod_capacity: Option<u8>,
}

/// Configuration for pod matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// How far outside a pod's exam window a learner's exam may fall
    pub exam_date_tolerance_days: u32,
    /// Capacity proposed for newly formed pods
    pub default_capacity: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            exam_date_tolerance_days: 14,
            default_capacity: 6,
        }
    }
}

/// A ranked candidate pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodCandidate {
    pub pod_id: PodId,
    /// |pod average exam date - learner exam date| in days
    pub exam_date_distance_days: i64,
    pub member_count: usize,
    pub capacity: u8,
    pub created_at: DateTime<Utc>,
}

/// Shape of the pod the matcher recommends creating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPodProposal {
    pub level: JlptLevel,
    pub exam_window_start: NaiveDate,
    pub exam_window_end: NaiveDate,
    pub capacity: u8,
}

/// Result of matching a learner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum MatchOutcome {
    /// Qualifying pods, best first; never empty
    Candidates { candidates: Vec<PodCandidate> },
    /// No pod qualifies; a new pod should be formed
    NoCapacity { proposal: NewPodProposal },
}

impl MatchOutcome {
    pub fn code(&self) -> &'static str {
        match self {
            MatchOutcome::Candidates { .. } => "candidates",
            MatchOutcome::NoCapacity { .. } => "no-capacity",
        }
    }

    /// Best candidate, if any.
    pub fn top(&self) -> Option<&PodCandidate> {
        match self {
            MatchOutcome::Candidates { candidates } => candidates.first(),
            MatchOutcome::NoCapacity { .. } => None,
        }
    }
}

/// Pod matcher.
#[derive(Debug, Clone, Default)]
pub struct PodMatcher {
    config: MatcherConfig,
}

impl PodMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: MatcherConfig) -> Self {
        Self { config }
    }

    /// Rank `pods` for `learner`.
    pub fn rank(&self, learner: &UserProfile, prefs: &MatchPreferences, pods: &[Pod]) -> MatchOutcome {
        let mut candidates: Vec<PodCandidate> = pods
            .iter()
            .filter(|pod| self.qualifies(learner, prefs, pod))
            .map(|pod| PodCandidate {
                pod_id: pod.id.clone(),
                exam_date_distance_days: (pod.average_exam_date() - learner.exam_date).num_days().abs(),
                member_count: pod.member_count(),
                capacity: pod.capacity,
                created_at: pod.created_at,
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.exam_date_distance_days
                .cmp(&b.exam_date_distance_days)
                .then(a.member_count.cmp(&b.member_count))
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.pod_id.cmp(&b.pod_id))
        });

        debug!(
            user_id = %learner.id,
            open_pods = pods.len(),
            qualifying = candidates.len(),
            "ranked pods"
        );

        if candidates.is_empty() {
            MatchOutcome::NoCapacity {
                proposal: self.proposal_for(learner),
            }
        } else {
            MatchOutcome::Candidates { candidates }
        }
    }

    fn qualifies(&self, learner: &UserProfile, prefs: &MatchPreferences, pod: &Pod) -> bool {
        let tolerance = self.tolerance();
        // A bound past the calendar's range leaves that side open
        let within_window = pod
            .exam_window_start
            .checked_sub_signed(tolerance)
            .map_or(true, |start| learner.exam_date >= start)
            && pod
                .exam_window_end
                .checked_add_signed(tolerance)
                .map_or(true, |end| learner.exam_date <= end);
        let within_pref = prefs
            .max_pod_capacity
            .map_or(true, |max| pod.capacity <= max);

        pod.level == learner.level
            && within_window
            && within_pref
            && pod.has_capacity()
            && !pod.is_member(&learner.id)
    }

    fn tolerance(&self) -> Duration {
        Duration::days(i64::from(self.config.exam_date_tolerance_days))
    }

    /// Pod shape recommended when nothing qualifies.
    pub fn proposal_for(&self, learner: &UserProfile) -> NewPodProposal {
        let tolerance = self.tolerance();
        NewPodProposal {
            level: learner.level,
            exam_window_start: learner
                .exam_date
                .checked_sub_signed(tolerance)
                .unwrap_or(NaiveDate::MIN),
            exam_window_end: learner
                .exam_date
                .checked_add_signed(tolerance)
                .unwrap_or(NaiveDate::MAX),
            capacity: self
                .config
                .default_capacity
                .clamp(MIN_POD_CAPACITY, MAX_POD_CAPACITY),
        }
    }

    /// Form a new pod from a proposal with `founder` as its first member.
    pub fn form_pod(
        &self,
        proposal: &NewPodProposal,
        founder: &UserProfile,
        now: DateTime<Utc>,
    ) -> Result<Pod, ValidationError> {
        let mut pod = Pod::new(
            Uuid::new_v4().to_string(),
            proposal.level,
            proposal.exam_window_start,
            proposal.exam_window_end,
            proposal.capacity,
            now,
        )?;
        pod.join(founder, now).map_err(|e| ValidationError::InvalidValue {
            field: "founder".into(),
            message: format!("cannot join proposed pod: {}", e.code()),
        })?;
        Ok(pod)
    }
}
