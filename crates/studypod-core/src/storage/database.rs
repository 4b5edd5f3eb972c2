//! SQLite-backed store.
//!
//! Provides persistent storage for:
//! - Learner profiles
//! - Pods and their rosters
//! - Accepted check-ins, unique per (user, pod, date)

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::info;

use super::data_dir;
use super::migrations;
use super::traits::{CheckInStore, CheckInWriter, DateRange};
use crate::error::{CoreError, StoreError};
use crate::model::{CheckIn, Mood, ProofType, UserProfile};
use crate::pod::{Pod, PodMember};

const DATE_FORMAT: &str = "%Y-%m-%d";
const DB_FILE: &str = "studypod.db";

/// SQLite database for pods and check-ins.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `~/.config/studypod/studypod.db`.
    ///
    /// # Errors
    /// Returns an error if the data directory is unavailable or the
    /// database cannot be opened or migrated.
    pub fn open() -> Result<Self, CoreError> {
        Ok(Self::open_in(&data_dir()?)?)
    }

    /// Open `studypod.db` inside `dir`.
    pub fn open_in(dir: &Path) -> Result<Self, StoreError> {
        Self::open_path(&dir.join(DB_FILE))
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_path(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_connection(conn)
    }

    /// Open an in-memory database.
    pub fn open_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        migrations::migrate(&conn)?;
        Ok(Self { conn })
    }

    fn members_of(&self, pod_id: &str) -> Result<Vec<PodMember>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id, exam_date, joined_at FROM pod_members
             WHERE pod_id = ?1
             ORDER BY joined_at, user_id",
        )?;
        let rows = stmt.query_map(params![pod_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut members = Vec::new();
        for row in rows {
            let (user_id, exam_date, joined_at) = row?;
            members.push(PodMember {
                user_id,
                exam_date: parse_date("pod_members", &exam_date)?,
                joined_at: parse_timestamp("pod_members", &joined_at)?,
            });
        }
        Ok(members)
    }

    fn load_pods(&self, where_clause: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Pod>, StoreError> {
        let sql = format!(
            "SELECT id, level, exam_window_start, exam_window_end, capacity, created_at
             FROM pods {where_clause} ORDER BY created_at, id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(args, |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, u8>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut pods = Vec::new();
        for row in rows {
            let (id, level, start, end, capacity, created_at) = row?;
            let members = self.members_of(&id)?;
            pods.push(Pod {
                level: level.parse().map_err(|e| corrupt("pods", e))?,
                exam_window_start: parse_date("pods", &start)?,
                exam_window_end: parse_date("pods", &end)?,
                capacity,
                members,
                created_at: parse_timestamp("pods", &created_at)?,
                id,
            });
        }
        Ok(pods)
    }

    fn load_check_ins(
        &self,
        column: &str,
        key: &str,
        range: DateRange,
    ) -> Result<Vec<CheckIn>, StoreError> {
        let start = range
            .start
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        let end = range
            .end
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_else(|| "9999-12-31".to_string());
        let sql = format!(
            "SELECT pod_id, user_id, date, study_minutes, proof_type, proof_content, mood, created_at
             FROM check_ins
             WHERE {column} = ?1 AND date >= ?2 AND date <= ?3
             ORDER BY date, created_at"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![key, start, end], |row| {
            Ok(RawCheckIn {
                pod_id: row.get(0)?,
                user_id: row.get(1)?,
                date: row.get(2)?,
                study_minutes: row.get(3)?,
                proof_type: row.get(4)?,
                proof_content: row.get(5)?,
                mood: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?.decode()?);
        }
        Ok(out)
    }
}

struct RawCheckIn {
    pod_id: String,
    user_id: String,
    date: String,
    study_minutes: u32,
    proof_type: String,
    proof_content: String,
    mood: String,
    created_at: String,
}

impl RawCheckIn {
    fn decode(self) -> Result<CheckIn, StoreError> {
        Ok(CheckIn {
            date: parse_date("check_ins", &self.date)?,
            proof_type: ProofType::parse(&self.proof_type)
                .ok_or_else(|| corrupt("check_ins", format!("unknown proof type '{}'", self.proof_type)))?,
            mood: Mood::parse(&self.mood)
                .ok_or_else(|| corrupt("check_ins", format!("unknown mood '{}'", self.mood)))?,
            created_at: parse_timestamp("check_ins", &self.created_at)?,
            pod_id: self.pod_id,
            user_id: self.user_id,
            study_minutes: self.study_minutes,
            proof_content: self.proof_content,
        })
    }
}

fn corrupt(table: &'static str, message: impl ToString) -> StoreError {
    StoreError::CorruptRow {
        table,
        message: message.to_string(),
    }
}

fn parse_date(table: &'static str, raw: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| corrupt(table, format!("bad date '{raw}': {e}")))
}

fn parse_timestamp(table: &'static str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| corrupt(table, format!("bad timestamp '{raw}': {e}")))
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl CheckInStore for Database {
    fn user(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, level, exam_date, utc_offset_minutes FROM users WHERE id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i32>(3)?,
                    ))
                },
            )
            .optional()?;

        match row {
            None => Ok(None),
            Some((id, level, exam_date, offset)) => Ok(Some(UserProfile {
                id,
                level: level.parse().map_err(|e| corrupt("users", e))?,
                exam_date: parse_date("users", &exam_date)?,
                utc_offset_minutes: offset,
            })),
        }
    }

    fn pod(&self, pod_id: &str) -> Result<Option<Pod>, StoreError> {
        Ok(self.load_pods("WHERE id = ?1", &[&pod_id])?.into_iter().next())
    }

    fn pods(&self) -> Result<Vec<Pod>, StoreError> {
        self.load_pods("", &[])
    }

    fn check_ins_for_user(&self, user_id: &str, range: DateRange) -> Result<Vec<CheckIn>, StoreError> {
        self.load_check_ins("user_id", user_id, range)
    }

    fn check_ins_for_pod(&self, pod_id: &str, range: DateRange) -> Result<Vec<CheckIn>, StoreError> {
        self.load_check_ins("pod_id", pod_id, range)
    }
}

impl CheckInWriter for Database {
    fn insert_check_in(&mut self, check_in: &CheckIn) -> Result<(), StoreError> {
        let result = self.conn.execute(
            "INSERT INTO check_ins
                (pod_id, user_id, date, study_minutes, proof_type, proof_content, mood, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                check_in.pod_id,
                check_in.user_id,
                check_in.date.format(DATE_FORMAT).to_string(),
                check_in.study_minutes,
                check_in.proof_type.as_str(),
                check_in.proof_content,
                check_in.mood.as_str(),
                check_in.created_at.to_rfc3339(),
            ],
        );
        match result {
            Ok(_) => {
                info!(
                    user_id = %check_in.user_id,
                    pod_id = %check_in.pod_id,
                    date = %check_in.date,
                    "recorded check-in"
                );
                Ok(())
            }
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateCheckIn {
                user_id: check_in.user_id.clone(),
                pod_id: check_in.pod_id.clone(),
                date: check_in.date,
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn upsert_pod(&mut self, pod: &Pod) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO pods (id, level, exam_window_start, exam_window_end, capacity, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
                level = excluded.level,
                exam_window_start = excluded.exam_window_start,
                exam_window_end = excluded.exam_window_end,
                capacity = excluded.capacity",
            params![
                pod.id,
                pod.level.as_str(),
                pod.exam_window_start.format(DATE_FORMAT).to_string(),
                pod.exam_window_end.format(DATE_FORMAT).to_string(),
                pod.capacity,
                pod.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute("DELETE FROM pod_members WHERE pod_id = ?1", params![pod.id])?;
        for member in &pod.members {
            tx.execute(
                "INSERT INTO pod_members (pod_id, user_id, exam_date, joined_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    pod.id,
                    member.user_id,
                    member.exam_date.format(DATE_FORMAT).to_string(),
                    member.joined_at.to_rfc3339(),
                ],
            )?;
        }
        tx.commit()?;
        info!(pod_id = %pod.id, members = pod.members.len(), "saved pod");
        Ok(())
    }

    fn upsert_user(&mut self, profile: &UserProfile) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO users (id, level, exam_date, utc_offset_minutes)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                profile.id,
                profile.level.as_str(),
                profile.exam_date.format(DATE_FORMAT).to_string(),
                profile.utc_offset_minutes,
            ],
        )?;
        Ok(())
    }

    fn remove_pod(&mut self, pod_id: &str) -> Result<(), StoreError> {
        let removed = self.conn.execute("DELETE FROM pods WHERE id = ?1", params![pod_id])?;
        if removed == 0 {
            return Err(StoreError::NotFound {
                kind: "pod",
                id: pod_id.to_string(),
            });
        }
        info!(pod_id, "removed pod");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::JlptLevel;
    use chrono::TimeZone;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn seeded() -> Database {
        let mut db = Database::open_memory().unwrap();
        let profile = UserProfile::new("alice", JlptLevel::N3, date(12, 7), 540).unwrap();
        db.upsert_user(&profile).unwrap();

        let created = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let mut pod = Pod::new("pod-1", JlptLevel::N3, date(12, 1), date(12, 14), 5, created).unwrap();
        pod.join(&profile, created).unwrap();
        db.upsert_pod(&pod).unwrap();
        db
    }

    fn check_in(day: u32) -> CheckIn {
        CheckIn {
            pod_id: "pod-1".into(),
            user_id: "alice".into(),
            date: date(6, day),
            study_minutes: 40,
            proof_type: ProofType::Link,
            proof_content: "https://example.com/log".into(),
            mood: Mood::Great,
            created_at: Utc.with_ymd_and_hms(2025, 6, day, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn user_and_pod_round_trip() {
        let db = seeded();
        let user = db.user("alice").unwrap().unwrap();
        assert_eq!(user.utc_offset_minutes, 540);
        assert!(db.user("nobody").unwrap().is_none());

        let pod = db.pod("pod-1").unwrap().unwrap();
        assert_eq!(pod.capacity, 5);
        assert!(pod.is_member("alice"));
        assert_eq!(db.pods_for_user("alice").unwrap().len(), 1);
    }

    #[test]
    fn unique_constraint_reports_duplicate() {
        let mut db = seeded();
        db.insert_check_in(&check_in(2)).unwrap();
        let err = db.insert_check_in(&check_in(2)).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateCheckIn { .. }));
    }

    #[test]
    fn range_query_filters_dates() {
        let mut db = seeded();
        for day in [1, 4, 9] {
            db.insert_check_in(&check_in(day)).unwrap();
        }
        let found = db
            .check_ins_for_pod("pod-1", DateRange::between(date(6, 2), date(6, 9)))
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0], check_in(4));
        assert_eq!(db.check_ins_for_user("alice", DateRange::all()).unwrap().len(), 3);
    }

    #[test]
    fn upsert_replaces_roster_and_remove_deletes() {
        let mut db = seeded();
        let mut pod = db.pod("pod-1").unwrap().unwrap();
        pod.leave("alice").unwrap();
        db.upsert_pod(&pod).unwrap();
        assert_eq!(db.pod("pod-1").unwrap().unwrap().member_count(), 0);

        db.remove_pod("pod-1").unwrap();
        assert!(db.pod("pod-1").unwrap().is_none());
        assert!(matches!(db.remove_pod("pod-1"), Err(StoreError::NotFound { .. })));
    }
}
