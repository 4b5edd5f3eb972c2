//! Pods: small groups of learners sharing a level and exam window.
//!
//! Membership changes are assumed to be serialized by the host; every
//! engine call observes one consistent roster snapshot.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::model::{JlptLevel, PodId, UserId, UserProfile};

/// Smallest allowed pod capacity.
pub const MIN_POD_CAPACITY: u8 = 3;

/// Largest allowed pod capacity.
pub const MAX_POD_CAPACITY: u8 = 8;

/// A member entry in a pod roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodMember {
    pub user_id: UserId,
    pub exam_date: NaiveDate,
    pub joined_at: DateTime<Utc>,
}

/// A study pod.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub id: PodId,
    pub level: JlptLevel,
    /// First exam date the pod targets (inclusive)
    pub exam_window_start: NaiveDate,
    /// Last exam date the pod targets (inclusive)
    pub exam_window_end: NaiveDate,
    pub capacity: u8,
    pub members: Vec<PodMember>,
    pub created_at: DateTime<Utc>,
}

/// Why a membership change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MembershipError {
    AlreadyMember,
    PodFull,
    LevelMismatch,
    NotAMember,
}

impl MembershipError {
    pub fn code(&self) -> &'static str {
        match self {
            MembershipError::AlreadyMember => "already-member",
            MembershipError::PodFull => "pod-full",
            MembershipError::LevelMismatch => "level-mismatch",
            MembershipError::NotAMember => "not-a-member",
        }
    }
}

impl Pod {
    /// Create an empty pod, validating capacity and exam window.
    pub fn new(
        id: impl Into<PodId>,
        level: JlptLevel,
        exam_window_start: NaiveDate,
        exam_window_end: NaiveDate,
        capacity: u8,
        created_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if !(MIN_POD_CAPACITY..=MAX_POD_CAPACITY).contains(&capacity) {
            return Err(ValidationError::OutOfRange {
                field: "capacity",
                min: MIN_POD_CAPACITY as i64,
                max: MAX_POD_CAPACITY as i64,
                value: capacity as i64,
            });
        }
        if exam_window_end < exam_window_start {
            return Err(ValidationError::InvalidDateRange {
                start: exam_window_start,
                end: exam_window_end,
            });
        }
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "id".into(),
                message: "pod id must not be blank".into(),
            });
        }
        Ok(Self {
            id,
            level,
            exam_window_start,
            exam_window_end,
            capacity,
            members: Vec::new(),
            created_at,
        })
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    pub fn is_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|m| m.user_id == user_id)
    }

    pub fn has_capacity(&self) -> bool {
        self.members.len() < self.capacity as usize
    }

    pub fn member_ids(&self) -> Vec<UserId> {
        self.members.iter().map(|m| m.user_id.clone()).collect()
    }

    /// Add a learner to the roster.
    pub fn join(&mut self, profile: &UserProfile, at: DateTime<Utc>) -> Result<(), MembershipError> {
        if self.is_member(&profile.id) {
            return Err(MembershipError::AlreadyMember);
        }
        if profile.level != self.level {
            return Err(MembershipError::LevelMismatch);
        }
        if !self.has_capacity() {
            return Err(MembershipError::PodFull);
        }
        self.members.push(PodMember {
            user_id: profile.id.clone(),
            exam_date: profile.exam_date,
            joined_at: at,
        });
        Ok(())
    }

    /// Remove a learner from the roster.
    pub fn leave(&mut self, user_id: &str) -> Result<PodMember, MembershipError> {
        let idx = self
            .members
            .iter()
            .position(|m| m.user_id == user_id)
            .ok_or(MembershipError::NotAMember)?;
        Ok(self.members.remove(idx))
    }

    /// Mean exam date of current members; window midpoint when empty.
    pub fn average_exam_date(&self) -> NaiveDate {
        if self.members.is_empty() {
            return self.window_midpoint();
        }
        let total: i64 = self
            .members
            .iter()
            .map(|m| m.exam_date.num_days_from_ce() as i64)
            .sum();
        let mean = total / self.members.len() as i64;
        NaiveDate::from_num_days_from_ce_opt(mean as i32).unwrap_or_else(|| self.window_midpoint())
    }

    fn window_midpoint(&self) -> NaiveDate {
        let span = (self.exam_window_end - self.exam_window_start).num_days();
        self.exam_window_start + chrono::Duration::days(span / 2)
    }

    /// A pod dissolves once empty or once its exam window has passed.
    pub fn should_dissolve(&self, today: NaiveDate) -> bool {
        self.members.is_empty() || today > self.exam_window_end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn profile(id: &str, level: JlptLevel, exam: NaiveDate) -> UserProfile {
        UserProfile::new(id, level, exam, 0).unwrap()
    }

    fn pod(capacity: u8) -> Pod {
        Pod::new(
            "pod-1",
            JlptLevel::N3,
            date(2025, 12, 1),
            date(2025, 12, 14),
            capacity,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn rejects_capacity_outside_three_to_eight() {
        let now = Utc::now();
        let start = date(2025, 12, 1);
        assert!(Pod::new("p", JlptLevel::N3, start, start, 2, now).is_err());
        assert!(Pod::new("p", JlptLevel::N3, start, start, 9, now).is_err());
        assert!(Pod::new("p", JlptLevel::N3, start, start, 3, now).is_ok());
        assert!(Pod::new("p", JlptLevel::N3, start, start, 8, now).is_ok());
    }

    #[test]
    fn rejects_inverted_window() {
        let result = Pod::new(
            "p",
            JlptLevel::N3,
            date(2025, 12, 14),
            date(2025, 12, 1),
            4,
            Utc::now(),
        );
        assert!(matches!(result, Err(ValidationError::InvalidDateRange { .. })));
    }

    #[test]
    fn join_enforces_level_capacity_and_uniqueness() {
        let mut pod = pod(3);
        let exam = date(2025, 12, 7);
        let now = Utc::now();

        assert_eq!(
            pod.join(&profile("x", JlptLevel::N2, exam), now),
            Err(MembershipError::LevelMismatch)
        );
        pod.join(&profile("a", JlptLevel::N3, exam), now).unwrap();
        assert_eq!(
            pod.join(&profile("a", JlptLevel::N3, exam), now),
            Err(MembershipError::AlreadyMember)
        );
        pod.join(&profile("b", JlptLevel::N3, exam), now).unwrap();
        pod.join(&profile("c", JlptLevel::N3, exam), now).unwrap();
        assert_eq!(
            pod.join(&profile("d", JlptLevel::N3, exam), now),
            Err(MembershipError::PodFull)
        );
    }

    #[test]
    fn leave_removes_member_and_reports_unknown() {
        let mut pod = pod(4);
        pod.join(&profile("a", JlptLevel::N3, date(2025, 12, 7)), Utc::now())
            .unwrap();
        assert_eq!(pod.leave("a").unwrap().user_id, "a");
        assert_eq!(pod.leave("a"), Err(MembershipError::NotAMember));
    }

    #[test]
    fn average_exam_date_uses_members_or_midpoint() {
        let mut pod = pod(4);
        assert_eq!(pod.average_exam_date(), date(2025, 12, 7));

        let now = Utc::now();
        pod.join(&profile("a", JlptLevel::N3, date(2025, 12, 2)), now).unwrap();
        pod.join(&profile("b", JlptLevel::N3, date(2025, 12, 12)), now).unwrap();
        assert_eq!(pod.average_exam_date(), date(2025, 12, 7));
    }

    #[test]
    fn dissolves_when_empty_or_past_window() {
        let mut pod = pod(4);
        assert!(pod.should_dissolve(date(2025, 11, 1)));

        pod.join(&profile("a", JlptLevel::N3, date(2025, 12, 7)), Utc::now())
            .unwrap();
        assert!(!pod.should_dissolve(date(2025, 12, 14)));
        assert!(pod.should_dissolve(date(2025, 12, 15)));
    }

    #[test]
    fn membership_error_codes_are_kebab_case() {
        assert_eq!(MembershipError::PodFull.code(), "pod-full");
        assert_eq!(
            serde_json::to_string(&MembershipError::LevelMismatch).unwrap(),
            "\"level-mismatch\""
        );
    }
}
