use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::model::{CheckIn, UserProfile};
use crate::pod::Pod;

/// Inclusive date range; open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    /// Unbounded range.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}

/// Read side of the check-in/pod data store. The engine never mutates
/// anything through this trait.
pub trait CheckInStore {
    fn user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError>;

    fn pod(&self, pod_id: &str) -> Result<Option<Pod>, StoreError>;

    /// Every pod currently on record.
    fn pods(&self) -> Result<Vec<Pod>, StoreError>;

    /// Pods the learner belongs to.
    fn pods_for_user(&self, user_id: &str) -> Result<Vec<Pod>, StoreError> {
        Ok(self
            .pods()?
            .into_iter()
            .filter(|p| p.is_member(user_id))
            .collect())
    }

    /// A learner's check-ins across all pods, ordered by date.
    fn check_ins_for_user(&self, user_id: &str, range: DateRange) -> Result<Vec<CheckIn>, StoreError>;

    /// All check-ins recorded in a pod, ordered by date.
    fn check_ins_for_pod(&self, pod_id: &str, range: DateRange) -> Result<Vec<CheckIn>, StoreError>;

    /// A learner's check-ins in one pod, ordered by date.
    fn check_ins_for_member(
        &self,
        user_id: &str,
        pod_id: &str,
        range: DateRange,
    ) -> Result<Vec<CheckIn>, StoreError> {
        Ok(self
            .check_ins_for_user(user_id, range)?
            .into_iter()
            .filter(|c| c.pod_id == pod_id)
            .collect())
    }
}

/// Write side used by the host. Implementations must enforce at most one
/// check-in per (user, pod, date) and report violations as
/// [`StoreError::DuplicateCheckIn`].
pub trait CheckInWriter {
    fn insert_check_in(&mut self, check_in: &CheckIn) -> Result<(), StoreError>;

    /// Insert or replace a pod and its roster.
    fn upsert_pod(&mut self, pod: &Pod) -> Result<(), StoreError>;

    fn upsert_user(&mut self, profile: &UserProfile) -> Result<(), StoreError>;

    /// Delete a pod and its roster. Check-ins are kept as history.
    fn remove_pod(&mut self, pod_id: &str) -> Result<(), StoreError>;
}
