//! Domain records shared by every engine component.
//!
//! Users are reference data owned by the account system; check-ins are
//! immutable once accepted. Everything here is plain serde data.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Unique identifier for a learner.
pub type UserId = String;

/// Unique identifier for a pod.
pub type PodId = String;

/// Largest supported distance from UTC, in minutes (UTC+14:00).
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// JLPT target level, easiest (N5) to hardest (N1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JlptLevel {
    N5,
    N4,
    N3,
    N2,
    N1,
}

impl JlptLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            JlptLevel::N5 => "N5",
            JlptLevel::N4 => "N4",
            JlptLevel::N3 => "N3",
            JlptLevel::N2 => "N2",
            JlptLevel::N1 => "N1",
        }
    }
}

impl fmt::Display for JlptLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JlptLevel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "N5" => Ok(JlptLevel::N5),
            "N4" => Ok(JlptLevel::N4),
            "N3" => Ok(JlptLevel::N3),
            "N2" => Ok(JlptLevel::N2),
            "N1" => Ok(JlptLevel::N1),
            other => Err(ValidationError::InvalidValue {
                field: "level".into(),
                message: format!("unknown JLPT level '{other}'"),
            }),
        }
    }
}

/// Learner profile fields the engine reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub level: JlptLevel,
    pub exam_date: NaiveDate,
    /// Fixed offset from UTC used to derive the learner's calendar date
    pub utc_offset_minutes: i32,
}

impl UserProfile {
    /// Build a profile, rejecting blank ids and impossible offsets.
    pub fn new(
        id: impl Into<UserId>,
        level: JlptLevel,
        exam_date: NaiveDate,
        utc_offset_minutes: i32,
    ) -> Result<Self, ValidationError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "id".into(),
                message: "user id must not be blank".into(),
            });
        }
        if utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(ValidationError::OutOfRange {
                field: "utc_offset_minutes",
                min: -(MAX_UTC_OFFSET_MINUTES as i64),
                max: MAX_UTC_OFFSET_MINUTES as i64,
                value: utc_offset_minutes as i64,
            });
        }
        Ok(Self {
            id,
            level,
            exam_date,
            utc_offset_minutes,
        })
    }

    /// Calendar date of `instant` in this learner's timezone.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        local_date(instant, self.utc_offset_minutes)
    }
}

/// Calendar date of `instant` shifted by a fixed UTC offset.
pub fn local_date(instant: DateTime<Utc>, utc_offset_minutes: i32) -> NaiveDate {
    (instant + Duration::minutes(utc_offset_minutes as i64)).date_naive()
}

/// Kind of evidence attached to a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofType {
    Screenshot,
    Note,
    Link,
}

impl ProofType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProofType::Screenshot => "screenshot",
            ProofType::Note => "note",
            ProofType::Link => "link",
        }
    }

    /// Parse a raw submission value; `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "screenshot" => Some(ProofType::Screenshot),
            "note" => Some(ProofType::Note),
            "link" => Some(ProofType::Link),
            _ => None,
        }
    }
}

/// Self-reported mood at check-in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Struggling,
    Okay,
    Great,
}

impl Mood {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Struggling => "struggling",
            Mood::Okay => "okay",
            Mood::Great => "great",
        }
    }

    /// Parse a raw submission value; `None` for anything unrecognized.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "struggling" => Some(Mood::Struggling),
            "okay" => Some(Mood::Okay),
            "great" => Some(Mood::Great),
            _ => None,
        }
    }
}

/// An accepted, immutable daily check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub pod_id: PodId,
    pub user_id: UserId,
    /// Calendar date in the learner's local timezone
    pub date: NaiveDate,
    pub study_minutes: u32,
    pub proof_type: ProofType,
    /// Reference to the proof (storage key, URL, or note text)
    pub proof_content: String,
    pub mood: Mood,
    pub created_at: DateTime<Utc>,
}
