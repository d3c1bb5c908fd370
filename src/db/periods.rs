//! Period, goal and tactic rows: the planning hierarchy above tasks.

use chrono::NaiveDate;
use rusqlite::{params, Row};

use super::TrackerDb;
use crate::error::TrackerError;
use crate::types::{Goal, Period, PeriodStatus, Tactic};

impl TrackerDb {
    /// Create a new active period. The end date is derived: start + 83 days,
    /// exactly 12 weeks.
    ///
    /// The store's partial unique index rejects a second active period; that
    /// violation surfaces as `TrackerError::Conflict`.
    pub fn create_period(&self, name: &str, start_date: NaiveDate) -> Result<Period, TrackerError> {
        let end_date = Period::end_date_for(start_date);
        let result = self.conn.execute(
            "INSERT INTO periods (name, start_date, end_date, status)
             VALUES (?1, ?2, ?3, 'active')",
            params![name, start_date, end_date],
        );

        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                Ok(Period {
                    id,
                    name: name.to_string(),
                    start_date,
                    end_date,
                    status: PeriodStatus::Active,
                })
            }
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(TrackerError::Conflict(
                    "an active period already exists".to_string(),
                ))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// The single active period, if any.
    pub fn active_period(&self) -> Result<Option<Period>, TrackerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, start_date, end_date, status
             FROM periods WHERE status = 'active' LIMIT 1",
        )?;
        let mut rows = stmt.query_map([], Self::map_period_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    pub fn get_period(&self, id: i64) -> Result<Option<Period>, TrackerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, start_date, end_date, status
             FROM periods WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id], Self::map_period_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Close out a period (completed or cancelled), freeing the active slot.
    pub fn set_period_status(&self, id: i64, status: PeriodStatus) -> Result<(), TrackerError> {
        let updated = self.conn.execute(
            "UPDATE periods SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(TrackerError::not_found("period", id));
        }
        Ok(())
    }

    pub fn create_goal(&self, period_id: i64, title: &str) -> Result<Goal, TrackerError> {
        self.conn.execute(
            "INSERT INTO goals (period_id, title) VALUES (?1, ?2)",
            params![period_id, title],
        )?;
        Ok(Goal {
            id: self.conn.last_insert_rowid(),
            period_id,
            title: title.to_string(),
        })
    }

    pub fn create_tactic(&self, goal_id: i64, title: &str) -> Result<Tactic, TrackerError> {
        self.conn.execute(
            "INSERT INTO tactics (goal_id, title) VALUES (?1, ?2)",
            params![goal_id, title],
        )?;
        Ok(Tactic {
            id: self.conn.last_insert_rowid(),
            goal_id,
            title: title.to_string(),
        })
    }

    pub fn goals_for_period(&self, period_id: i64) -> Result<Vec<Goal>, TrackerError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, period_id, title FROM goals WHERE period_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![period_id], |row| {
            Ok(Goal {
                id: row.get(0)?,
                period_id: row.get(1)?,
                title: row.get(2)?,
            })
        })?;

        let mut goals = Vec::new();
        for row in rows {
            goals.push(row?);
        }
        Ok(goals)
    }

    pub(super) fn map_period_row(row: &Row<'_>) -> rusqlite::Result<Period> {
        let status_str: String = row.get(4)?;
        let status = PeriodStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("unknown period status '{}'", status_str).into(),
            )
        })?;
        Ok(Period {
            id: row.get(0)?,
            name: row.get(1)?,
            start_date: row.get(2)?,
            end_date: row.get(3)?,
            status,
        })
    }
}
