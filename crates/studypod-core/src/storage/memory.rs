//! In-memory store, used by tests and embedders that keep their own
//! persistence.

use std::collections::BTreeMap;

use super::traits::{CheckInStore, CheckInWriter, DateRange};
use crate::error::StoreError;
use crate::model::{CheckIn, PodId, UserId, UserProfile};
use crate::pod::Pod;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: BTreeMap<UserId, UserProfile>,
    pods: BTreeMap<PodId, Pod>,
    check_ins: Vec<CheckIn>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut check_ins: Vec<CheckIn>) -> Vec<CheckIn> {
        check_ins.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.created_at.cmp(&b.created_at)));
        check_ins
    }
}

impl CheckInStore for MemoryStore {
    fn user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.get(user_id).cloned())
    }

    fn pod(&self, pod_id: &str) -> Result<Option<Pod>, StoreError> {
        Ok(self.pods.get(pod_id).cloned())
    }

    fn pods(&self) -> Result<Vec<Pod>, StoreError> {
        Ok(self.pods.values().cloned().collect())
    }

    fn check_ins_for_user(&self, user_id: &str, range: DateRange) -> Result<Vec<CheckIn>, StoreError> {
        Ok(Self::sorted(
            self.check_ins
                .iter()
                .filter(|c| c.user_id == user_id && range.contains(c.date))
                .cloned()
                .collect(),
        ))
    }

    fn check_ins_for_pod(&self, pod_id: &str, range: DateRange) -> Result<Vec<CheckIn>, StoreError> {
        Ok(Self::sorted(
            self.check_ins
                .iter()
                .filter(|c| c.pod_id == pod_id && range.contains(c.date))
                .cloned()
                .collect(),
        ))
    }
}

impl CheckInWriter for MemoryStore {
    fn insert_check_in(&mut self, check_in: &CheckIn) -> Result<(), StoreError> {
        let exists = self.check_ins.iter().any(|c| {
            c.user_id == check_in.user_id && c.pod_id == check_in.pod_id && c.date == check_in.date
        });
        if exists {
            return Err(StoreError::DuplicateCheckIn {
                user_id: check_in.user_id.clone(),
                pod_id: check_in.pod_id.clone(),
                date: check_in.date,
            });
        }
        self.check_ins.push(check_in.clone());
        Ok(())
    }

    fn upsert_pod(&mut self, pod: &Pod) -> Result<(), StoreError> {
        self.pods.insert(pod.id.clone(), pod.clone());
        Ok(())
    }

    fn upsert_user(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        self.users.insert(profile.id.clone(), profile.clone());
        Ok(())
    }

    fn remove_pod(&mut self, pod_id: &str) -> Result<(), StoreError> {
        self.pods.remove(pod_id).map(|_| ()).ok_or_else(|| StoreError::NotFound {
            kind: "pod",
            id: pod_id.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Mood, ProofType};
    use chrono::{NaiveDate, Utc};

    fn check_in(day: u32) -> CheckIn {
        CheckIn {
            pod_id: "pod".into(),
            user_id: "u".into(),
            date: NaiveDate::from_ymd_opt(2025, 6, day).unwrap(),
            study_minutes: 25,
            proof_type: ProofType::Screenshot,
            proof_content: "s3://proof/1.png".into(),
            mood: Mood::Okay,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn duplicate_triple_is_refused() {
        let mut store = MemoryStore::new();
        store.insert_check_in(&check_in(3)).unwrap();
        let err = store.insert_check_in(&check_in(3)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCheckIn { .. }));
    }

    #[test]
    fn range_queries_are_sorted_and_bounded() {
        let mut store = MemoryStore::new();
        for day in [5, 1, 3] {
            store.insert_check_in(&check_in(day)).unwrap();
        }
        let range = DateRange::between(
            NaiveDate::from_ymd_opt(2025, 6, 2).unwrap(),
            NaiveDate::from_ymd_opt(2025, 6, 5).unwrap(),
        );
        let days: Vec<u32> = store
            .check_ins_for_member("u", "pod", range)
            .unwrap()
            .iter()
            .map(|c| chrono::Datelike::day(&c.date))
            .collect();
        assert_eq!(days, vec![3, 5]);
    }
}
