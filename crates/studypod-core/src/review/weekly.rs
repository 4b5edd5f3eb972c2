use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use super::week::WeekKey;
use crate::error::ValidationError;
use crate::model::{CheckIn, Mood, PodId, UserId};
use crate::pod::Pod;

/// What a review summarizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReviewSubject {
    Pod { pod_id: PodId },
    User { user_id: UserId },
}

/// Count of check-ins per mood.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodDistribution {
    pub struggling: u32,
    pub okay: u32,
    pub great: u32,
}

impl MoodDistribution {
    pub fn record(&mut self, mood: Mood) {
        match mood {
            Mood::Struggling => self.struggling += 1,
            Mood::Okay => self.okay += 1,
            Mood::Great => self.great += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.struggling + self.okay + self.great
    }

    pub fn merge(&mut self, other: &MoodDistribution) {
        self.struggling += other.struggling;
        self.okay += other.okay;
        self.great += other.great;
    }

    /// Share of check-ins marked struggling (0.0 when empty).
    pub fn struggling_share(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.struggling as f64 / total as f64,
        }
    }
}

/// Aggregate of one subject's check-ins over one ISO week.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyReview {
    pub subject: ReviewSubject,
    pub week: WeekKey,
    pub total_check_ins: u32,
    pub total_minutes: u32,
    pub mood: MoodDistribution,
    /// Members with at least one check-in this week
    pub participating_members: u32,
    pub member_count: u32,
    /// participating / members, within [0, 1]
    pub participation_rate: f64,
    /// Minutes per member, zero for members without check-ins
    pub member_minutes: BTreeMap<UserId, u32>,
    /// Days of the week included (7 once finalized)
    pub elapsed_days: u32,
    /// True once the whole week lies before the evaluation date
    pub finalized: bool,
}

impl WeeklyReview {
    /// Median of per-member minutes; 0.0 when there are no members.
    pub fn median_member_minutes(&self) -> f64 {
        median(self.member_minutes.values().copied().collect())
    }

    pub fn is_partial(&self) -> bool {
        !self.finalized
    }
}

/// Median of a list of minute totals.
pub(crate) fn median(mut values: Vec<u32>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] as f64 + values[mid] as f64) / 2.0
    } else {
        values[mid] as f64
    }
}

/// Builds [`WeeklyReview`] records from check-in history.
#[derive(Debug, Clone, Default)]
pub struct WeeklyReviewAggregator;

impl WeeklyReviewAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Review of a pod for `week`, evaluated on `as_of`.
    pub fn for_pod(
        &self,
        pod: &Pod,
        check_ins: &[CheckIn],
        week: WeekKey,
        as_of: NaiveDate,
    ) -> Result<WeeklyReview, ValidationError> {
        let subject = ReviewSubject::Pod {
            pod_id: pod.id.clone(),
        };
        self.aggregate(subject, &pod.member_ids(), check_ins, week, as_of)
    }

    /// Review of one learner across all pods for `week`, evaluated on `as_of`.
    pub fn for_user(
        &self,
        user_id: &str,
        check_ins: &[CheckIn],
        week: WeekKey,
        as_of: NaiveDate,
    ) -> Result<WeeklyReview, ValidationError> {
        let subject = ReviewSubject::User {
            user_id: user_id.to_string(),
        };
        self.aggregate(subject, &[user_id.to_string()], check_ins, week, as_of)
    }

    /// Aggregate check-ins of `members` that fall inside `week` and on or
    /// before `as_of`. Pod subjects additionally require a matching pod id.
    pub fn aggregate(
        &self,
        subject: ReviewSubject,
        members: &[UserId],
        check_ins: &[CheckIn],
        week: WeekKey,
        as_of: NaiveDate,
    ) -> Result<WeeklyReview, ValidationError> {
        let (start, end) = match (week.start(), week.end()) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(ValidationError::InvalidValue {
                    field: "week".into(),
                    message: format!("{week} is not a valid ISO week"),
                })
            }
        };

        let member_set: BTreeSet<&str> = members.iter().map(String::as_str).collect();
        let mut member_minutes: BTreeMap<UserId, u32> =
            member_set.iter().map(|m| (m.to_string(), 0)).collect();
        let mut participants: BTreeSet<&str> = BTreeSet::new();
        let mut mood = MoodDistribution::default();
        let mut total_check_ins = 0u32;
        let mut total_minutes = 0u32;

        for check_in in check_ins {
            let in_scope = match &subject {
                ReviewSubject::Pod { pod_id } => &check_in.pod_id == pod_id,
                ReviewSubject::User { .. } => true,
            };
            if !in_scope
                || check_in.date < start
                || check_in.date > end
                || check_in.date > as_of
                || !member_set.contains(check_in.user_id.as_str())
            {
                continue;
            }
            total_check_ins += 1;
            total_minutes = total_minutes.saturating_add(check_in.study_minutes);
            mood.record(check_in.mood);
            participants.insert(check_in.user_id.as_str());
            if let Some(minutes) = member_minutes.get_mut(&check_in.user_id) {
                *minutes = minutes.saturating_add(check_in.study_minutes);
            }
        }

        let member_count = member_set.len() as u32;
        let participating_members = participants.len() as u32;
        let participation_rate = if member_count == 0 {
            0.0
        } else {
            participating_members as f64 / member_count as f64
        };

        let elapsed_days = if as_of < start {
            0
        } else if as_of > end {
            7
        } else {
            (as_of - start).num_days() as u32 + 1
        };
        let finalized = as_of > end;

        debug!(
            %week,
            total_check_ins,
            participating_members,
            member_count,
            finalized,
            "aggregated weekly review"
        );

        Ok(WeeklyReview {
            subject,
            week,
            total_check_ins,
            total_minutes,
            mood,
            participating_members,
            member_count,
            participation_rate,
            member_minutes,
            elapsed_days,
            finalized,
        })
    }

    /// Reviews for the `weeks` weeks ending with the week of `as_of`,
    /// oldest first.
    pub fn pod_history(
        &self,
        pod: &Pod,
        check_ins: &[CheckIn],
        as_of: NaiveDate,
        weeks: u32,
    ) -> Result<Vec<WeeklyReview>, ValidationError> {
        collect_history(as_of, weeks, |week| self.for_pod(pod, check_ins, week, as_of))
    }

    /// Learner counterpart of [`Self::pod_history`].
    pub fn user_history(
        &self,
        user_id: &str,
        check_ins: &[CheckIn],
        as_of: NaiveDate,
        weeks: u32,
    ) -> Result<Vec<WeeklyReview>, ValidationError> {
        collect_history(as_of, weeks, |week| self.for_user(user_id, check_ins, week, as_of))
    }
}

fn collect_history<F>(as_of: NaiveDate, weeks: u32, mut review: F) -> Result<Vec<WeeklyReview>, ValidationError>
where
    F: FnMut(WeekKey) -> Result<WeeklyReview, ValidationError>,
{
    let mut out = Vec::new();
    let mut week = Some(WeekKey::of(as_of));
    for _ in 0..weeks {
        let Some(current) = week else { break };
        out.push(review(current)?);
        week = current.previous();
    }
    out.reverse();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{JlptLevel, ProofType, UserProfile};
    use chrono::{TimeZone, Utc};

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn check_in(user: &str, pod: &str, date: NaiveDate, minutes: u32, mood: Mood) -> CheckIn {
        CheckIn {
            pod_id: pod.into(),
            user_id: user.into(),
            date,
            study_minutes: minutes,
            proof_type: ProofType::Note,
            proof_content: "notes".into(),
            mood,
            created_at: Utc::now(),
        }
    }

    fn four_member_pod() -> Pod {
        let created = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut pod = Pod::new("pod", JlptLevel::N3, june(1), june(30), 6, created).unwrap();
        for id in ["a", "b", "c", "d"] {
            let profile = UserProfile::new(id, JlptLevel::N3, june(20), 0).unwrap();
            pod.join(&profile, created).unwrap();
        }
        pod
    }

    // 2025-W23 runs Monday June 2 to Sunday June 8
    fn week23() -> WeekKey {
        WeekKey::of(june(2))
    }

    #[test]
    fn three_of_four_members_is_three_quarters() {
        let pod = four_member_pod();
        let history = vec![
            check_in("a", "pod", june(2), 30, Mood::Great),
            check_in("a", "pod", june(3), 20, Mood::Okay),
            check_in("b", "pod", june(4), 45, Mood::Struggling),
            check_in("c", "pod", june(8), 60, Mood::Okay),
            // Outside the week, another pod, and a non-member
            check_in("d", "pod", june(9), 60, Mood::Okay),
            check_in("d", "other", june(5), 60, Mood::Okay),
            check_in("zed", "pod", june(5), 60, Mood::Okay),
        ];

        let review = WeeklyReviewAggregator::new()
            .for_pod(&pod, &history, week23(), june(10))
            .unwrap();
        assert_eq!(review.participation_rate, 0.75);
        assert_eq!(review.total_check_ins, 4);
        assert_eq!(review.total_minutes, 155);
        assert_eq!(
            review.mood,
            MoodDistribution {
                struggling: 1,
                okay: 2,
                great: 1
            }
        );
        assert_eq!(review.member_minutes["d"], 0);
        assert!(review.finalized);
        assert_eq!(review.elapsed_days, 7);
    }

    #[test]
    fn current_week_is_partial_over_elapsed_days() {
        let pod = four_member_pod();
        let history = vec![
            check_in("a", "pod", june(2), 30, Mood::Great),
            check_in("b", "pod", june(4), 30, Mood::Great),
            check_in("c", "pod", june(6), 30, Mood::Great),
        ];

        let review = WeeklyReviewAggregator::new()
            .for_pod(&pod, &history, week23(), june(4))
            .unwrap();
        assert!(review.is_partial());
        assert_eq!(review.elapsed_days, 3);
        assert_eq!(review.total_check_ins, 2);
        assert_eq!(review.participation_rate, 0.5);
    }

    #[test]
    fn week_finalizes_only_after_sunday() {
        let pod = four_member_pod();
        let agg = WeeklyReviewAggregator::new();
        assert!(!agg.for_pod(&pod, &[], week23(), june(8)).unwrap().finalized);
        assert!(agg.for_pod(&pod, &[], week23(), june(9)).unwrap().finalized);
    }

    #[test]
    fn empty_roster_has_zero_participation() {
        let review = WeeklyReviewAggregator::new()
            .aggregate(
                ReviewSubject::Pod { pod_id: "pod".into() },
                &[],
                &[check_in("a", "pod", june(3), 30, Mood::Okay)],
                week23(),
                june(10),
            )
            .unwrap();
        assert_eq!(review.participation_rate, 0.0);
        assert_eq!(review.total_check_ins, 0);
    }

    #[test]
    fn user_review_spans_pods() {
        let history = vec![
            check_in("a", "pod", june(2), 30, Mood::Okay),
            check_in("a", "other", june(3), 40, Mood::Struggling),
            check_in("b", "pod", june(3), 50, Mood::Okay),
        ];
        let review = WeeklyReviewAggregator::new()
            .for_user("a", &history, week23(), june(10))
            .unwrap();
        assert_eq!(review.total_minutes, 70);
        assert_eq!(review.participation_rate, 1.0);
        assert_eq!(review.mood.struggling_share(), 0.5);
    }

    #[test]
    fn invalid_week_is_rejected() {
        let result = WeeklyReviewAggregator::new().for_user(
            "a",
            &[],
            WeekKey { year: 2025, week: 60 },
            june(10),
        );
        assert!(result.is_err());
    }

    #[test]
    fn history_is_oldest_first_and_ends_with_current_week() {
        let pod = four_member_pod();
        let reviews = WeeklyReviewAggregator::new()
            .pod_history(&pod, &[], june(18), 3)
            .unwrap();
        let weeks: Vec<String> = reviews.iter().map(|r| r.week.to_string()).collect();
        assert_eq!(weeks, vec!["2025-W23", "2025-W24", "2025-W25"]);
        assert!(reviews[0].finalized);
        assert!(!reviews[2].finalized);
    }

    #[test]
    fn median_handles_even_and_odd_counts() {
        assert_eq!(median(vec![]), 0.0);
        assert_eq!(median(vec![30, 10, 20]), 20.0);
        assert_eq!(median(vec![40, 10, 20, 30]), 25.0);
    }
}
