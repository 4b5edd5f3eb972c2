//! Check-in validation.
//!
//! Decides whether a raw submission becomes an accepted [`CheckIn`].
//! Validation never persists anything: an accepted decision carries the
//! normalized record and the caller stores it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{local_date, CheckIn, Mood, PodId, ProofType, UserId};
use crate::pod::Pod;

/// Default ceiling for study minutes in one daily check-in (12 hours).
pub const DEFAULT_MAX_DAILY_MINUTES: u32 = 720;

/// A check-in as submitted by the presentation layer, before validation.
///
/// Proof type and mood arrive as raw text so unrecognized values are
/// rejected here instead of failing deserialization upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInSubmission {
    pub user_id: UserId,
    pub pod_id: PodId,
    pub submitted_at: DateTime<Utc>,
    pub study_minutes: i64,
    pub proof_type: String,
    pub proof_content: String,
    pub mood: String,
}

/// Closed set of rejection reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RejectReason {
    MissingField,
    DuplicateDay,
    NotAMember,
    InvalidProof,
    MinutesOutOfRange,
    InvalidMood,
}

impl RejectReason {
    pub fn code(&self) -> &'static str {
        match self {
            RejectReason::MissingField => "missing-field",
            RejectReason::DuplicateDay => "duplicate-day",
            RejectReason::NotAMember => "not-a-member",
            RejectReason::InvalidProof => "invalid-proof",
            RejectReason::MinutesOutOfRange => "minutes-out-of-range",
            RejectReason::InvalidMood => "invalid-mood",
        }
    }
}

/// Outcome of validating a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum CheckInDecision {
    Accept { check_in: CheckIn },
    Reject { reason: RejectReason },
}

impl CheckInDecision {
    pub fn is_accept(&self) -> bool {
        matches!(self, CheckInDecision::Accept { .. })
    }

    pub fn reject_reason(&self) -> Option<RejectReason> {
        match self {
            CheckInDecision::Reject { reason } => Some(*reason),
            CheckInDecision::Accept { .. } => None,
        }
    }
}

/// Configuration for check-in validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Upper bound on study minutes for a single day
    pub max_daily_minutes: u32,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            max_daily_minutes: DEFAULT_MAX_DAILY_MINUTES,
        }
    }
}

/// Validator for daily check-ins.
#[derive(Debug, Clone, Default)]
pub struct CheckInValidator {
    config: ValidatorConfig,
}

impl CheckInValidator {
    /// Create a validator with default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a validator with custom config.
    pub fn with_config(config: ValidatorConfig) -> Self {
        Self { config }
    }

    /// Validate `submission` against the pod roster and the learner's
    /// existing check-ins for that pod.
    ///
    /// The calendar date is derived from `submitted_at` in the learner's
    /// timezone (`utc_offset_minutes`), so late-night submissions land on
    /// the learner's own day.
    pub fn validate(
        &self,
        submission: &CheckInSubmission,
        pod: &Pod,
        utc_offset_minutes: i32,
        existing: &[CheckIn],
    ) -> CheckInDecision {
        let date = local_date(submission.submitted_at, utc_offset_minutes);
        let decision = self.decide(submission, pod, date, existing);
        debug!(
            user_id = %submission.user_id,
            pod_id = %submission.pod_id,
            %date,
            accepted = decision.is_accept(),
            reason = decision.reject_reason().map(|r| r.code()),
            "validated check-in"
        );
        decision
    }

    fn decide(
        &self,
        submission: &CheckInSubmission,
        pod: &Pod,
        date: chrono::NaiveDate,
        existing: &[CheckIn],
    ) -> CheckInDecision {
        let reject = |reason| CheckInDecision::Reject { reason };

        if submission.user_id.trim().is_empty() || submission.pod_id.trim().is_empty() {
            return reject(RejectReason::MissingField);
        }

        let duplicate = existing.iter().any(|c| {
            c.user_id == submission.user_id && c.pod_id == submission.pod_id && c.date == date
        });
        if duplicate {
            return reject(RejectReason::DuplicateDay);
        }

        if pod.id != submission.pod_id || !pod.is_member(&submission.user_id) {
            return reject(RejectReason::NotAMember);
        }

        let proof_type = match ProofType::parse(&submission.proof_type) {
            Some(kind) if !submission.proof_content.trim().is_empty() => kind,
            _ => return reject(RejectReason::InvalidProof),
        };

        if submission.study_minutes <= 0
            || submission.study_minutes > self.config.max_daily_minutes as i64
        {
            return reject(RejectReason::MinutesOutOfRange);
        }

        let Some(mood) = Mood::parse(&submission.mood) else {
            return reject(RejectReason::InvalidMood);
        };

        CheckInDecision::Accept {
            check_in: CheckIn {
                pod_id: submission.pod_id.clone(),
                user_id: submission.user_id.clone(),
                date,
                study_minutes: submission.study_minutes as u32,
                proof_type,
                proof_content: submission.proof_content.trim().to_string(),
                mood,
                created_at: submission.submitted_at,
            },
        }
    }
}
