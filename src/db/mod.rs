//! SQLite-backed store for the planning hierarchy and the progress ledger.
//!
//! The database lives at `~/.paceline/paceline.db`. The store enforces the
//! two structural contracts the engine relies on: the partial unique index
//! that allows at most one active period, and the `(task_id, log_date)`
//! uniqueness that guarantees at most one ledger row per task per day even
//! under concurrent writers.

use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::error::TrackerError;

pub mod logs;
pub mod periods;
pub mod recipients;
pub mod tasks;

pub struct TrackerDb {
    conn: Connection,
    path: PathBuf,
}

impl TrackerDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// The file this store was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open (or create) the database at `~/.paceline/paceline.db` and apply
    /// pending schema migrations.
    pub fn open() -> Result<Self, TrackerError> {
        let path = Self::db_path()?;
        Self::open_at(&path)
    }

    /// Open a database at an explicit path. Also used by tests.
    pub fn open_at(path: &Path) -> Result<Self, TrackerError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(TrackerError::CreateDir)?;
            }
        }

        let conn = Connection::open(path)?;

        // WAL for better concurrent read behavior between the scheduler tick
        // and the responder.
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        crate::migrations::run_migrations(&conn).map_err(TrackerError::Migration)?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Resolve the default database path: `~/.paceline/paceline.db`.
    fn db_path() -> Result<PathBuf, TrackerError> {
        let home = dirs::home_dir().ok_or(TrackerError::HomeDirNotFound)?;
        Ok(home.join(".paceline").join("paceline.db"))
    }
}

// =============================================================================
// Shared test utilities
// =============================================================================

#[cfg(test)]
pub mod test_utils {
    use chrono::{NaiveDate, NaiveTime};

    use super::TrackerDb;
    use crate::schedule::WeekdaySchedule;
    use crate::types::{MetricType, NewTask, Period, Task};

    /// Create a temporary database for testing.
    ///
    /// The `TempDir` is leaked so the directory persists for the duration of
    /// the test; the OS cleans up test temp dirs.
    pub fn test_db() -> TrackerDb {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("test.db");
        std::mem::forget(dir);
        TrackerDb::open_at(&path).expect("Failed to open test database")
    }

    /// Seed an active period starting 2024-01-01 (a Monday) with one goal and
    /// one tactic; returns `(period, goal_id, tactic_id)`.
    pub fn seed_hierarchy(db: &TrackerDb) -> (Period, i64, i64) {
        seed_hierarchy_from(db, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    pub fn seed_hierarchy_from(db: &TrackerDb, start: NaiveDate) -> (Period, i64, i64) {
        let period = db.create_period("Test period", start).expect("period");
        let goal = db.create_goal(period.id, "Ship the thing").expect("goal");
        let tactic = db.create_tactic(goal.id, "Work daily").expect("tactic");
        (period, goal.id, tactic.id)
    }

    /// Insert a task under the given tactic with sensible defaults.
    pub fn seed_task(db: &TrackerDb, tactic_id: i64, metric_type: MetricType) -> Task {
        db.insert_task(&NewTask {
            tactic_id,
            title: "Read the book".to_string(),
            metric_type,
            total_target: None,
            unit: None,
            speed_per_hour: None,
            daily_time_minutes: None,
            weekdays: WeekdaySchedule::every_day(),
            reminder_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        })
        .expect("task")
    }

    /// A custom-metric task with a total target, the common quantitative case.
    pub fn seed_quantitative_task(db: &TrackerDb, tactic_id: i64, total: f64) -> Task {
        db.insert_task(&NewTask {
            tactic_id,
            title: "Write pages".to_string(),
            metric_type: MetricType::Custom,
            total_target: Some(total),
            unit: Some("pages".to_string()),
            speed_per_hour: None,
            daily_time_minutes: None,
            weekdays: WeekdaySchedule::every_day(),
            reminder_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
        })
        .expect("task")
    }
}

#[cfg(test)]
mod tests {
    use super::test_utils::test_db;

    #[test]
    fn test_open_creates_tables() {
        let db = test_db();
        let count: i32 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .expect("tasks table should exist");
        assert_eq!(count, 0);

        let count: i32 = db
            .conn_ref()
            .query_row("SELECT COUNT(*) FROM task_logs", [], |row| row.get(0))
            .expect("task_logs table should exist");
        assert_eq!(count, 0);
    }

    #[test]
    fn test_idempotent_schema_application() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("idempotent.db");

        let _db1 = super::TrackerDb::open_at(&path).expect("first open");
        let _db2 = super::TrackerDb::open_at(&path).expect("second open should not fail");
    }
}
