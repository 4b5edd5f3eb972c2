//! End-to-end tests for the accountability service over SQLite.
//!
//! Covers the full loop from pod formation through check-ins to streaks,
//! reviews and coaching, and that everything survives reopening the file.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use studypod_core::{
    AccountabilityService, CheckInSubmission, Config, Database, InsightKind, JlptLevel,
    MatchPreferences, MembershipChange, RejectReason, StreakStatus, UserProfile, WeekKey,
};

fn date(m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, m, d).unwrap()
}

fn at(m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, m, d, h, 0, 0).unwrap()
}

fn submission(user: &str, pod: &str, when: DateTime<Utc>, minutes: i64, mood: &str) -> CheckInSubmission {
    CheckInSubmission {
        user_id: user.into(),
        pod_id: pod.into(),
        submitted_at: when,
        study_minutes: minutes,
        proof_type: "screenshot".into(),
        proof_content: "https://img.example/anki.png".into(),
        mood: mood.into(),
    }
}

#[test]
fn pod_lifecycle_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("studypod.db");

    let pod_id = {
        let db = Database::open_path(&path).unwrap();
        let mut svc = AccountabilityService::new(db, Config::default());

        // Tokyo learner founds a pod, two more join
        let founder = UserProfile::new("aiko", JlptLevel::N3, date(12, 7), 9 * 60).unwrap();
        svc.register_user(&founder).unwrap();
        let outcome = svc.match_learner("aiko", &MatchPreferences::default()).unwrap();
        assert_eq!(outcome.code(), "no-capacity");
        let pod = svc.form_pod_for("aiko", at(6, 1, 0)).unwrap();

        for (id, offset) in [("ben", 0), ("carla", -5 * 60)] {
            let profile = UserProfile::new(id, JlptLevel::N3, date(12, 1), offset).unwrap();
            svc.register_user(&profile).unwrap();
            let outcome = svc.match_learner(id, &MatchPreferences::default()).unwrap();
            assert_eq!(outcome.top().map(|c| c.pod_id.clone()), Some(pod.id.clone()));
            let change = svc.join_pod(id, &pod.id, at(6, 1, 0)).unwrap();
            assert!(matches!(change, MembershipChange::Applied { .. }));
        }

        // 23:30 local in Tokyo is 14:30 UTC the same day
        for day in 2..=8 {
            let when = Utc.with_ymd_and_hms(2025, 6, day, 14, 30, 0).unwrap();
            let decision = svc.submit_check_in(&submission("aiko", &pod.id, when, 40, "great")).unwrap();
            assert!(decision.is_accept(), "day {day}: {decision:?}");
        }
        let decision = svc
            .submit_check_in(&submission("ben", &pod.id, at(6, 3, 12), 90, "struggling"))
            .unwrap();
        assert!(decision.is_accept());

        pod.id
    };

    // Reopen: everything is still there and duplicates are still caught
    let db = Database::open_path(&path).unwrap();
    let mut svc = AccountabilityService::new(db, Config::default());

    let again = svc
        .submit_check_in(&submission("ben", &pod_id, at(6, 3, 18), 20, "okay"))
        .unwrap();
    assert_eq!(again.reject_reason(), Some(RejectReason::DuplicateDay));

    // 23:45 on June 8 in Tokyo
    let late_evening = Utc.with_ymd_and_hms(2025, 6, 8, 14, 45, 0).unwrap();
    let streak = svc.streak_for("aiko", Some(&pod_id), late_evening).unwrap();
    assert_eq!(streak.current, 7);
    assert_eq!(streak.status, StreakStatus::Active);

    let review = svc.pod_review(&pod_id, WeekKey::of(date(6, 2)), date(6, 9)).unwrap();
    assert!(review.finalized);
    assert_eq!(review.member_count, 3);
    assert_eq!(review.participating_members, 2);
    assert_eq!(review.total_check_ins, 8);
    assert_eq!(review.total_minutes, 7 * 40 + 90);

    let insights = svc.coach("aiko", &pod_id, late_evening).unwrap();
    assert!(insights.iter().any(|i| i.kind == InsightKind::Encourage));
}

#[test]
fn latest_miss_is_bridged_and_older_miss_ends_streak() {
    let db = Database::open_memory().unwrap();
    let mut svc = AccountabilityService::new(db, Config::default());
    let profile = UserProfile::new("dev", JlptLevel::N2, date(12, 7), 0).unwrap();
    svc.register_user(&profile).unwrap();
    let pod = svc.form_pod_for("dev", at(6, 1, 0)).unwrap();

    // Days 1-3, miss 4, days 5-7
    for day in [1, 2, 3, 5, 6, 7] {
        svc.submit_check_in(&submission("dev", &pod.id, at(6, day, 10), 30, "okay"))
            .unwrap();
    }
    let streak = svc.streak_for("dev", Some(&pod.id), at(6, 7, 20)).unwrap();
    assert!(streak.grace_consumed);
    assert_eq!(streak.status, StreakStatus::Active);
    assert_eq!(streak.grace_days, vec![date(6, 4)]);

    // Miss 8, check in on 9: day 8 takes the grace and day 4 ends the streak
    svc.submit_check_in(&submission("dev", &pod.id, at(6, 9, 10), 30, "okay"))
        .unwrap();
    let streak = svc.streak_for("dev", Some(&pod.id), at(6, 9, 20)).unwrap();
    assert_eq!(streak.current, 4);
    assert_eq!(streak.grace_days, vec![date(6, 8)]);
    assert_eq!(streak.status, StreakStatus::Active);
    assert_eq!(streak.longest, 4);
}

#[test]
fn expired_pods_are_dissolved() {
    let db = Database::open_memory().unwrap();
    let mut svc = AccountabilityService::new(db, Config::default());
    let profile = UserProfile::new("eve", JlptLevel::N5, date(7, 6), 0).unwrap();
    svc.register_user(&profile).unwrap();
    let pod = svc.form_pod_for("eve", at(6, 1, 0)).unwrap();

    let window_end = pod.exam_window_end;
    let still_open = svc.dissolve_expired(at(6, 2, 0)).unwrap();
    assert!(still_open.is_empty());

    let after = Utc.from_utc_datetime(&(window_end + Duration::days(1)).and_hms_opt(0, 0, 0).unwrap());
    let removed = svc.dissolve_expired(after).unwrap();
    assert_eq!(removed, vec![pod.id]);
}
