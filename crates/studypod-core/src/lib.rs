//! # studypod core
//!
//! Accountability engine for small exam-prep study pods. Learners preparing
//! for the same JLPT level and exam window share a pod, check in daily with
//! proof of study, and get streaks, weekly reviews and rule-based coaching
//! derived from that history.
//!
//! ## Architecture
//!
//! - **Engine**: pure, synchronous components that take plain data and
//!   return plain data: [`CheckInValidator`], [`StreakCalculator`],
//!   [`PodMatcher`], [`WeeklyReviewAggregator`] and [`CoachingEngine`]
//! - **Storage**: [`CheckInStore`]/[`CheckInWriter`] contracts with an
//!   in-memory and a SQLite implementation, plus TOML [`Config`]
//! - **Service**: [`AccountabilityService`] wires a store to the engine
//!
//! Business outcomes such as rejected check-ins or full pods are returned as
//! values; [`CoreError`] is reserved for infrastructure failures.

pub mod checkin;
pub mod coaching;
pub mod error;
pub mod matcher;
pub mod model;
pub mod pod;
pub mod review;
pub mod service;
pub mod storage;
pub mod streak;

pub use checkin::{CheckInDecision, CheckInSubmission, CheckInValidator, RejectReason, ValidatorConfig};
pub use coaching::{
    CoachingConfig, CoachingEngine, CoachingInsight, CoachingRule, Evidence, InsightKind, InsightTarget,
    NotifyDecision, NotifyPolicy, ReminderDecision,
};
pub use error::{ConfigError, CoreError, StoreError, ValidationError};
pub use matcher::{MatchOutcome, MatchPreferences, MatcherConfig, NewPodProposal, PodCandidate, PodMatcher};
pub use model::{CheckIn, JlptLevel, Mood, PodId, ProofType, UserId, UserProfile};
pub use pod::{MembershipError, Pod, PodMember};
pub use review::{MoodDistribution, ReviewSubject, WeekKey, WeeklyReview, WeeklyReviewAggregator};
pub use service::{AccountabilityService, MembershipChange};
pub use storage::{CheckInStore, CheckInWriter, Config, Database, DateRange, MemoryStore};
pub use streak::{StreakCalculator, StreakConfig, StreakScope, StreakState, StreakStatus};
