//! Ledger rows: one entry per task per calendar day, upsert semantics.
//!
//! The `(task_id, log_date)` unique constraint is the idempotency source of
//! truth; concurrent writers for the same day collapse into one row.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Row};

use super::TrackerDb;
use crate::error::TrackerError;
use crate::types::TaskLog;

impl TrackerDb {
    /// Insert-or-update the ledger row for `(task_id, date)` and return the
    /// persisted row.
    pub fn upsert_log(
        &self,
        task_id: i64,
        date: NaiveDate,
        week_number: u8,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
        accumulated_progress: f64,
    ) -> Result<TaskLog, TrackerError> {
        self.conn.execute(
            "INSERT INTO task_logs (task_id, log_date, week_number, completed,
                                    completed_at, accumulated_progress)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (task_id, log_date) DO UPDATE SET
               week_number = excluded.week_number,
               completed = excluded.completed,
               completed_at = excluded.completed_at,
               accumulated_progress = excluded.accumulated_progress",
            params![
                task_id,
                date,
                week_number,
                completed,
                completed_at,
                accumulated_progress
            ],
        )?;

        self.get_log(task_id, date)?
            .ok_or_else(|| TrackerError::not_found("task_log", task_id))
    }

    pub fn get_log(&self, task_id: i64, date: NaiveDate) -> Result<Option<TaskLog>, TrackerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, log_date, week_number, completed, completed_at,
                    accumulated_progress
             FROM task_logs WHERE task_id = ?1 AND log_date = ?2",
        )?;
        let mut rows = stmt.query_map(params![task_id, date], Self::map_log_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Highest banked progress strictly before `date` (0 when none): the
    /// running baseline a new day's delta is added to.
    pub fn max_progress_before(&self, task_id: i64, date: NaiveDate) -> Result<f64, TrackerError> {
        let progress: f64 = self.conn.query_row(
            "SELECT COALESCE(MAX(accumulated_progress), 0)
             FROM task_logs WHERE task_id = ?1 AND log_date < ?2",
            params![task_id, date],
            |row| row.get(0),
        )?;
        Ok(progress)
    }

    /// Highest banked progress over the task's whole history.
    pub fn max_progress(&self, task_id: i64) -> Result<f64, TrackerError> {
        let progress: f64 = self.conn.query_row(
            "SELECT COALESCE(MAX(accumulated_progress), 0)
             FROM task_logs WHERE task_id = ?1",
            params![task_id],
            |row| row.get(0),
        )?;
        Ok(progress)
    }

    /// `(total, completed)` entry counts for one task.
    pub fn log_counts(&self, task_id: i64) -> Result<(i64, i64), TrackerError> {
        let counts = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(completed), 0)
             FROM task_logs WHERE task_id = ?1",
            params![task_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// `(total, completed)` entry counts across a period's tasks for one week.
    pub fn week_counts(&self, period_id: i64, week_number: u8) -> Result<(i64, i64), TrackerError> {
        let counts = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(tl.completed), 0)
             FROM task_logs tl
             JOIN tasks t ON tl.task_id = t.id
             JOIN tactics tc ON t.tactic_id = tc.id
             JOIN goals g ON tc.goal_id = g.id
             WHERE g.period_id = ?1 AND tl.week_number = ?2",
            params![period_id, week_number],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Same as `week_counts`, scoped to one goal.
    pub fn week_counts_for_goal(
        &self,
        goal_id: i64,
        week_number: u8,
    ) -> Result<(i64, i64), TrackerError> {
        let counts = self.conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(tl.completed), 0)
             FROM task_logs tl
             JOIN tasks t ON tl.task_id = t.id
             JOIN tactics tc ON t.tactic_id = tc.id
             WHERE tc.goal_id = ?1 AND tl.week_number = ?2",
            params![goal_id, week_number],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Ledger rows for a task ordered by date, newest first.
    pub fn logs_for_task(&self, task_id: i64) -> Result<Vec<TaskLog>, TrackerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, task_id, log_date, week_number, completed, completed_at,
                    accumulated_progress
             FROM task_logs WHERE task_id = ?1
             ORDER BY log_date DESC",
        )?;
        let rows = stmt.query_map(params![task_id], Self::map_log_row)?;

        let mut logs = Vec::new();
        for row in rows {
            logs.push(row?);
        }
        Ok(logs)
    }

    fn map_log_row(row: &Row<'_>) -> rusqlite::Result<TaskLog> {
        let week: i64 = row.get(3)?;
        Ok(TaskLog {
            id: row.get(0)?,
            task_id: row.get(1)?,
            log_date: row.get(2)?,
            week_number: week as u8,
            completed: row.get(4)?,
            completed_at: row.get(5)?,
            accumulated_progress: row.get(6)?,
        })
    }
}
