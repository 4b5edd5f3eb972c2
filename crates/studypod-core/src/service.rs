//! Store-backed facade over the engine components.
//!
//! The engine itself is pure. [`AccountabilityService`] loads what each
//! component needs from a store, runs it, and persists the few things that
//! are writes: users, pods and accepted check-ins.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::checkin::{CheckInDecision, CheckInSubmission, CheckInValidator, RejectReason};
use crate::coaching::{
    check_in_reminder, CoachingEngine, CoachingInput, CoachingInsight, NotificationRecord,
    NotifyDecision, NotifyPolicy, ReminderDecision,
};
use crate::error::{Result, StoreError};
use crate::matcher::{MatchOutcome, MatchPreferences, PodMatcher};
use crate::model::{CheckIn, PodId, UserProfile};
use crate::pod::{MembershipError, Pod};
use crate::review::{WeekKey, WeeklyReview, WeeklyReviewAggregator};
use crate::storage::{CheckInStore, CheckInWriter, Config, DateRange};
use crate::streak::{StreakCalculator, StreakScope, StreakState};

/// Result of a join or leave request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", rename_all = "snake_case")]
pub enum MembershipChange {
    Applied { pod: Pod },
    Rejected { reason: MembershipError },
    /// The last member left or the exam window passed; the pod is gone.
    Dissolved { pod_id: PodId },
}

/// Accountability engine bound to a store.
pub struct AccountabilityService<S> {
    store: S,
    config: Config,
    validator: CheckInValidator,
    streaks: StreakCalculator,
    matcher: PodMatcher,
    reviews: WeeklyReviewAggregator,
    coaching: CoachingEngine,
}

impl<S: CheckInStore + CheckInWriter> AccountabilityService<S> {
    pub fn new(store: S, config: Config) -> Self {
        Self {
            validator: CheckInValidator::with_config(config.validator.clone()),
            streaks: StreakCalculator::with_config(config.streak.clone()),
            matcher: PodMatcher::with_config(config.matcher.clone()),
            reviews: WeeklyReviewAggregator::new(),
            coaching: CoachingEngine::with_config(config.coaching.clone()),
            store,
            config,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_store(self) -> S {
        self.store
    }

    fn require_user(&self, user_id: &str) -> Result<UserProfile> {
        self.store.user(user_id)?.ok_or_else(|| {
            StoreError::NotFound {
                kind: "user",
                id: user_id.to_string(),
            }
            .into()
        })
    }

    fn require_pod(&self, pod_id: &str) -> Result<Pod> {
        self.store.pod(pod_id)?.ok_or_else(|| {
            StoreError::NotFound {
                kind: "pod",
                id: pod_id.to_string(),
            }
            .into()
        })
    }

    /// Create or update a learner profile.
    pub fn register_user(&mut self, profile: &UserProfile) -> Result<()> {
        self.store.upsert_user(profile)?;
        info!(user_id = %profile.id, level = %profile.level, "registered user");
        Ok(())
    }

    pub fn user(&self, user_id: &str) -> Result<UserProfile> {
        self.require_user(user_id)
    }

    pub fn pod(&self, pod_id: &str) -> Result<Pod> {
        self.require_pod(pod_id)
    }

    pub fn pods(&self) -> Result<Vec<Pod>> {
        Ok(self.store.pods()?)
    }

    /// Pods a registered learner currently belongs to.
    pub fn pods_for_user(&self, user_id: &str) -> Result<Vec<Pod>> {
        self.require_user(user_id)?;
        Ok(self.store.pods_for_user(user_id)?)
    }

    /// Persist a new pod. Refuses to overwrite an existing id.
    pub fn create_pod(&mut self, pod: &Pod) -> Result<()> {
        if self.store.pod(&pod.id)?.is_some() {
            return Err(crate::error::ValidationError::InvalidValue {
                field: "id".into(),
                message: format!("pod '{}' already exists", pod.id),
            }
            .into());
        }
        self.store.upsert_pod(pod)?;
        info!(pod_id = %pod.id, level = %pod.level, capacity = pod.capacity, "created pod");
        Ok(())
    }

    /// Validate a submission and persist it when accepted.
    ///
    /// Unknown users or pods are rejected as `not-a-member`. When a
    /// concurrent submission wins the race, the store's uniqueness
    /// conflict comes back as `duplicate-day`.
    pub fn submit_check_in(&mut self, submission: &CheckInSubmission) -> Result<CheckInDecision> {
        let reject = |reason| Ok(CheckInDecision::Reject { reason });

        if submission.user_id.trim().is_empty() || submission.pod_id.trim().is_empty() {
            return reject(RejectReason::MissingField);
        }
        let (Some(profile), Some(pod)) = (
            self.store.user(&submission.user_id)?,
            self.store.pod(&submission.pod_id)?,
        ) else {
            return reject(RejectReason::NotAMember);
        };

        let date = profile.local_date(submission.submitted_at);
        let existing = self.store.check_ins_for_member(
            &submission.user_id,
            &submission.pod_id,
            DateRange::between(date, date),
        )?;

        let decision = self
            .validator
            .validate(submission, &pod, profile.utc_offset_minutes, &existing);
        let check_in = match decision {
            CheckInDecision::Accept { check_in } => check_in,
            rejected @ CheckInDecision::Reject { .. } => return Ok(rejected),
        };

        match self.store.insert_check_in(&check_in) {
            Ok(()) => {
                info!(
                    user_id = %check_in.user_id,
                    pod_id = %check_in.pod_id,
                    date = %check_in.date,
                    minutes = check_in.study_minutes,
                    "recorded check-in"
                );
                Ok(CheckInDecision::Accept { check_in })
            }
            Err(StoreError::DuplicateCheckIn { .. }) => reject(RejectReason::DuplicateDay),
            Err(e) => Err(e.into()),
        }
    }

    /// A learner's check-ins, optionally restricted to one pod.
    pub fn check_ins(&self, user_id: &str, pod_id: Option<&str>, range: DateRange) -> Result<Vec<CheckIn>> {
        Ok(match pod_id {
            Some(pod_id) => self.store.check_ins_for_member(user_id, pod_id, range)?,
            None => self.store.check_ins_for_user(user_id, range)?,
        })
    }

    /// Current streak as of `now` in the learner's timezone.
    ///
    /// With per-pod scope and a pod given, only that pod's check-ins count.
    pub fn streak_for(&self, user_id: &str, pod_id: Option<&str>, now: DateTime<Utc>) -> Result<StreakState> {
        let profile = self.require_user(user_id)?;
        let today = profile.local_date(now);
        self.streak_on(user_id, pod_id, today)
    }

    fn streak_on(&self, user_id: &str, pod_id: Option<&str>, today: NaiveDate) -> Result<StreakState> {
        let scoped_pod = match self.streaks.config().scope {
            StreakScope::PerPod => pod_id,
            StreakScope::AllPods => None,
        };
        let history = self.check_ins(user_id, scoped_pod, DateRange { start: None, end: Some(today) })?;
        Ok(self.streaks.compute(&history, scoped_pod, today))
    }

    pub fn pod_review(&self, pod_id: &str, week: WeekKey, as_of: NaiveDate) -> Result<WeeklyReview> {
        let pod = self.require_pod(pod_id)?;
        let check_ins = self.store.check_ins_for_pod(pod_id, week_range(week))?;
        Ok(self.reviews.for_pod(&pod, &check_ins, week, as_of)?)
    }

    pub fn user_review(&self, user_id: &str, week: WeekKey, as_of: NaiveDate) -> Result<WeeklyReview> {
        self.require_user(user_id)?;
        let check_ins = self.store.check_ins_for_user(user_id, week_range(week))?;
        Ok(self.reviews.for_user(user_id, &check_ins, week, as_of)?)
    }

    /// Coaching insights for a learner within one pod.
    ///
    /// Loads one week more than the coaching window so the window is full
    /// of finalized weeks even mid-week.
    pub fn coach(&self, user_id: &str, pod_id: &str, now: DateTime<Utc>) -> Result<Vec<CoachingInsight>> {
        let profile = self.require_user(user_id)?;
        let pod = self.require_pod(pod_id)?;
        let today = profile.local_date(now);

        let weeks = self.coaching.config().window_weeks.saturating_add(1);
        let range = DateRange {
            start: today.checked_sub_signed(Duration::weeks(i64::from(weeks))),
            end: Some(today),
        };
        let pod_check_ins = self.store.check_ins_for_pod(pod_id, range)?;
        let user_check_ins = self.store.check_ins_for_user(user_id, range)?;

        let pod_reviews = self.reviews.pod_history(&pod, &pod_check_ins, today, weeks)?;
        let user_reviews = self.reviews.user_history(user_id, &user_check_ins, today, weeks)?;
        let streak = self.streak_on(user_id, Some(pod_id), today)?;

        Ok(self.coaching.evaluate(&CoachingInput {
            user_id,
            pod_id,
            streak: &streak,
            user_reviews: &user_reviews,
            pod_reviews: &pod_reviews,
            generated_at: now,
        }))
    }

    /// Whether `insight` should be pushed given past notifications.
    pub fn notify_decision(
        &self,
        insight: &CoachingInsight,
        history: &[NotificationRecord],
        now: DateTime<Utc>,
    ) -> NotifyDecision {
        NotifyPolicy::new(self.config.coaching.notify_cooldown_hours).decide(insight, history, now)
    }

    /// Evening "keep your streak" reminder check.
    pub fn remind(&self, user_id: &str, pod_id: Option<&str>, now: DateTime<Utc>) -> Result<ReminderDecision> {
        let profile = self.require_user(user_id)?;
        let today = profile.local_date(now);
        let streak = self.streak_on(user_id, pod_id, today)?;
        let todays = self.check_ins(user_id, pod_id, DateRange::between(today, today))?;
        Ok(check_in_reminder(
            &profile,
            &streak,
            &todays,
            now,
            self.config.coaching.reminder_hour,
        ))
    }

    /// Rank open pods for a learner.
    pub fn match_learner(&self, user_id: &str, prefs: &MatchPreferences) -> Result<MatchOutcome> {
        let profile = self.require_user(user_id)?;
        let pods = self.store.pods()?;
        let outcome = self.matcher.rank(&profile, prefs, &pods);
        debug!(user_id, outcome = outcome.code(), "matched learner");
        Ok(outcome)
    }

    /// Form and persist a new pod around `user_id` using the default
    /// proposal for their level and exam date.
    pub fn form_pod_for(&mut self, user_id: &str, now: DateTime<Utc>) -> Result<Pod> {
        let profile = self.require_user(user_id)?;
        let proposal = self.matcher.proposal_for(&profile);
        let pod = self.matcher.form_pod(&proposal, &profile, now)?;
        self.store.upsert_pod(&pod)?;
        info!(pod_id = %pod.id, founder = %profile.id, "formed pod");
        Ok(pod)
    }

    pub fn join_pod(&mut self, user_id: &str, pod_id: &str, now: DateTime<Utc>) -> Result<MembershipChange> {
        let profile = self.require_user(user_id)?;
        let mut pod = self.require_pod(pod_id)?;
        if let Err(reason) = pod.join(&profile, now) {
            return Ok(MembershipChange::Rejected { reason });
        }
        self.store.upsert_pod(&pod)?;
        info!(user_id, pod_id, members = pod.member_count(), "joined pod");
        Ok(MembershipChange::Applied { pod })
    }

    /// Remove a learner; dissolves the pod when that empties it.
    pub fn leave_pod(&mut self, user_id: &str, pod_id: &str, now: DateTime<Utc>) -> Result<MembershipChange> {
        let mut pod = self.require_pod(pod_id)?;
        if let Err(reason) = pod.leave(user_id) {
            return Ok(MembershipChange::Rejected { reason });
        }
        if pod.should_dissolve(now.date_naive()) {
            self.store.remove_pod(pod_id)?;
            info!(pod_id, "dissolved pod");
            return Ok(MembershipChange::Dissolved {
                pod_id: pod_id.to_string(),
            });
        }
        self.store.upsert_pod(&pod)?;
        info!(user_id, pod_id, members = pod.member_count(), "left pod");
        Ok(MembershipChange::Applied { pod })
    }

    /// Remove every pod that is empty or whose exam window has passed.
    pub fn dissolve_expired(&mut self, now: DateTime<Utc>) -> Result<Vec<PodId>> {
        let today = now.date_naive();
        let expired: Vec<PodId> = self
            .store
            .pods()?
            .into_iter()
            .filter(|p| p.should_dissolve(today))
            .map(|p| p.id)
            .collect();
        for pod_id in &expired {
            self.store.remove_pod(pod_id)?;
            info!(pod_id = %pod_id, "dissolved pod");
        }
        Ok(expired)
    }
}

fn week_range(week: WeekKey) -> DateRange {
    DateRange {
        start: week.start(),
        end: week.end(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coaching::InsightKind;
    use crate::model::JlptLevel;
    use crate::storage::MemoryStore;
    use chrono::TimeZone;

    fn june(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn noon(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap()
    }

    fn service() -> AccountabilityService<MemoryStore> {
        let mut svc = AccountabilityService::new(MemoryStore::new(), Config::default());
        for id in ["aiko", "ben", "chen"] {
            let profile = UserProfile::new(id, JlptLevel::N3, june(30) + Duration::days(30), 0).unwrap();
            svc.register_user(&profile).unwrap();
        }
        let pod = Pod::new("pod-1", JlptLevel::N3, june(20), NaiveDate::from_ymd_opt(2025, 8, 20).unwrap(), 4, noon(1))
            .unwrap();
        svc.create_pod(&pod).unwrap();
        for id in ["aiko", "ben", "chen"] {
            svc.join_pod(id, "pod-1", noon(1)).unwrap();
        }
        svc
    }

    fn submission(user: &str, at: DateTime<Utc>, minutes: i64) -> CheckInSubmission {
        CheckInSubmission {
            user_id: user.into(),
            pod_id: "pod-1".into(),
            submitted_at: at,
            study_minutes: minutes,
            proof_type: "note".into(),
            proof_content: "kanji deck 40 cards".into(),
            mood: "okay".into(),
        }
    }

    #[test]
    fn accepted_check_in_is_persisted_and_second_is_duplicate() {
        let mut svc = service();
        let first = svc.submit_check_in(&submission("aiko", noon(2), 45)).unwrap();
        assert!(first.is_accept());
        assert_eq!(svc.check_ins("aiko", Some("pod-1"), DateRange::all()).unwrap().len(), 1);

        let second = svc.submit_check_in(&submission("aiko", noon(2), 30)).unwrap();
        assert_eq!(second.reject_reason(), Some(RejectReason::DuplicateDay));
    }

    #[test]
    fn unknown_user_or_pod_is_not_a_member() {
        let mut svc = service();
        let decision = svc.submit_check_in(&submission("zed", noon(2), 45)).unwrap();
        assert_eq!(decision.reject_reason(), Some(RejectReason::NotAMember));

        let mut other_pod = submission("aiko", noon(2), 45);
        other_pod.pod_id = "pod-404".into();
        let decision = svc.submit_check_in(&other_pod).unwrap();
        assert_eq!(decision.reject_reason(), Some(RejectReason::NotAMember));

        let mut blank = submission("aiko", noon(2), 45);
        blank.user_id = " ".into();
        let decision = svc.submit_check_in(&blank).unwrap();
        assert_eq!(decision.reject_reason(), Some(RejectReason::MissingField));
    }

    #[test]
    fn rejected_check_in_is_not_persisted() {
        let mut svc = service();
        let decision = svc.submit_check_in(&submission("aiko", noon(2), 0)).unwrap();
        assert!(matches!(decision, CheckInDecision::Reject { .. }));
        assert!(svc.check_ins("aiko", None, DateRange::all()).unwrap().is_empty());
    }

    #[test]
    fn streak_follows_submitted_days() {
        let mut svc = service();
        for day in 2..=5 {
            svc.submit_check_in(&submission("aiko", noon(day), 30)).unwrap();
        }
        let streak = svc.streak_for("aiko", Some("pod-1"), noon(5)).unwrap();
        assert_eq!(streak.current, 4);
        // Recomputing changes nothing
        assert_eq!(svc.streak_for("aiko", Some("pod-1"), noon(5)).unwrap(), streak);
    }

    #[test]
    fn pod_review_counts_participants() {
        let mut svc = service();
        svc.submit_check_in(&submission("aiko", noon(2), 30)).unwrap();
        svc.submit_check_in(&submission("ben", noon(3), 60)).unwrap();
        let review = svc.pod_review("pod-1", WeekKey::of(june(2)), june(9)).unwrap();
        assert_eq!(review.participating_members, 2);
        assert_eq!(review.member_count, 3);
        assert_eq!(review.total_minutes, 90);
        assert!(review.finalized);
    }

    #[test]
    fn coaching_celebrates_seven_day_streak() {
        let mut svc = service();
        for day in 2..=8 {
            svc.submit_check_in(&submission("aiko", noon(day), 30)).unwrap();
        }
        let insights = svc.coach("aiko", "pod-1", noon(8)).unwrap();
        assert!(insights.iter().any(|i| i.kind == InsightKind::Encourage));
    }

    #[test]
    fn leaving_last_member_dissolves_pod() {
        let mut svc = service();
        for id in ["aiko", "ben"] {
            let change = svc.leave_pod(id, "pod-1", noon(10)).unwrap();
            assert!(matches!(change, MembershipChange::Applied { .. }));
        }
        let change = svc.leave_pod("chen", "pod-1", noon(10)).unwrap();
        assert_eq!(
            change,
            MembershipChange::Dissolved {
                pod_id: "pod-1".into()
            }
        );
        assert!(svc.pods().unwrap().is_empty());
    }

    #[test]
    fn pods_for_user_lists_memberships_only() {
        let mut svc = service();
        let other = Pod::new("pod-2", JlptLevel::N3, june(30), june(30) + Duration::days(14), 4, noon(1)).unwrap();
        svc.create_pod(&other).unwrap();

        let pods = svc.pods_for_user("aiko").unwrap();
        let ids: Vec<_> = pods.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["pod-1"]);
        assert_eq!(svc.pods().unwrap().len(), 2);
        assert!(svc.pods_for_user("zed").is_err());
    }

    #[test]
    fn join_reports_business_rejections_as_values() {
        let mut svc = service();
        let change = svc.join_pod("aiko", "pod-1", noon(2)).unwrap();
        assert_eq!(
            change,
            MembershipChange::Rejected {
                reason: MembershipError::AlreadyMember
            }
        );
        assert!(svc.join_pod("zed", "pod-1", noon(2)).is_err());
    }

    #[test]
    fn match_falls_back_to_forming_a_pod() {
        let mut svc = service();
        let n1 = UserProfile::new("dana", JlptLevel::N1, june(30), 0).unwrap();
        svc.register_user(&n1).unwrap();

        let outcome = svc.match_learner("dana", &MatchPreferences::default()).unwrap();
        assert_eq!(outcome.code(), "no-capacity");

        let pod = svc.form_pod_for("dana", noon(2)).unwrap();
        assert!(pod.is_member("dana"));
        let newcomer = UserProfile::new("eri", JlptLevel::N3, june(30) + Duration::days(30), 0).unwrap();
        svc.register_user(&newcomer).unwrap();
        let outcome = svc.match_learner("eri", &MatchPreferences::default()).unwrap();
        assert_eq!(outcome.top().map(|c| c.pod_id.as_str()), Some("pod-1"));
    }

    #[test]
    fn remind_nudges_in_the_evening_only_before_check_in() {
        let mut svc = service();
        svc.submit_check_in(&submission("aiko", noon(2), 30)).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 6, 3, 21, 0, 0).unwrap();
        assert_eq!(
            svc.remind("aiko", Some("pod-1"), evening).unwrap(),
            ReminderDecision::Remind { streak: 1 }
        );

        svc.submit_check_in(&submission("aiko", noon(3), 30)).unwrap();
        assert!(matches!(
            svc.remind("aiko", Some("pod-1"), evening).unwrap(),
            ReminderDecision::Skip { .. }
        ));
    }

    #[test]
    fn dissolve_expired_removes_past_windows() {
        let mut svc = service();
        let after_window = Utc.with_ymd_and_hms(2025, 9, 1, 0, 0, 0).unwrap();
        let removed = svc.dissolve_expired(after_window).unwrap();
        assert_eq!(removed, vec!["pod-1".to_string()]);
    }
}
