//! Task rows and the joined task→tactic→goal→period context.

use chrono::{Datelike, NaiveDate, NaiveTime};
use rusqlite::{params, Row};

use super::TrackerDb;
use crate::error::TrackerError;
use crate::pacing;
use crate::schedule::WeekdaySchedule;
use crate::types::{MetricType, NewTask, Period, PeriodStatus, Task, TaskContext};

const TASK_COLUMNS: &str = "t.id, t.tactic_id, t.title, t.metric_type, t.total_target, t.unit,
     t.speed_per_hour, t.daily_time_minutes, t.daily_target, t.weekdays,
     t.reminder_time, t.is_active";

const CONTEXT_COLUMNS: &str = "t.id, t.tactic_id, t.title, t.metric_type, t.total_target, t.unit,
     t.speed_per_hour, t.daily_time_minutes, t.daily_target, t.weekdays,
     t.reminder_time, t.is_active,
     tc.title, g.title,
     p.id, p.name, p.start_date, p.end_date, p.status";

const HIERARCHY_JOINS: &str = "FROM tasks t
     JOIN tactics tc ON t.tactic_id = tc.id
     JOIN goals g ON tc.goal_id = g.id
     JOIN periods p ON g.period_id = p.id";

impl TrackerDb {
    /// Insert a task, deriving and caching its daily target from the pacing
    /// calculator.
    pub fn insert_task(&self, new: &NewTask) -> Result<Task, TrackerError> {
        let daily_target = pacing::daily_target(
            new.metric_type,
            new.total_target,
            new.speed_per_hour,
            new.daily_time_minutes,
            new.weekdays,
        );

        self.conn.execute(
            "INSERT INTO tasks (tactic_id, title, metric_type, total_target, unit,
                                speed_per_hour, daily_time_minutes, daily_target,
                                weekdays, reminder_time)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                new.tactic_id,
                new.title,
                new.metric_type.as_str(),
                new.total_target,
                new.unit,
                new.speed_per_hour,
                new.daily_time_minutes,
                daily_target,
                new.weekdays.mask(),
                new.reminder_time.format("%H:%M").to_string(),
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.get_task(id)?
            .ok_or_else(|| TrackerError::not_found("task", id))
    }

    pub fn get_task(&self, id: i64) -> Result<Option<Task>, TrackerError> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks t WHERE t.id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], Self::map_task_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Task joined with its owning tactic, goal and period.
    pub fn get_task_context(&self, id: i64) -> Result<Option<TaskContext>, TrackerError> {
        let sql = format!("SELECT {CONTEXT_COLUMNS} {HIERARCHY_JOINS} WHERE t.id = ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], Self::map_context_row)?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Overwrite the cached daily target. Called by the redistribution engine.
    pub fn update_daily_target(
        &self,
        task_id: i64,
        daily_target: Option<f64>,
    ) -> Result<(), TrackerError> {
        let updated = self.conn.execute(
            "UPDATE tasks SET daily_target = ?1 WHERE id = ?2",
            params![daily_target, task_id],
        )?;
        if updated == 0 {
            return Err(TrackerError::not_found("task", task_id));
        }
        Ok(())
    }

    /// Re-derive the daily target from the pacing calculator. Called by the
    /// CRUD layer after any pacing input changes.
    pub fn recompute_daily_target(&self, task_id: i64) -> Result<Option<f64>, TrackerError> {
        let task = self
            .get_task(task_id)?
            .ok_or_else(|| TrackerError::not_found("task", task_id))?;
        let target = pacing::for_task(&task);
        self.update_daily_target(task_id, target)?;
        Ok(target)
    }

    /// Logical delete: excluded from scheduling and indicators, ledger
    /// history retained.
    pub fn set_task_active(&self, task_id: i64, is_active: bool) -> Result<(), TrackerError> {
        let updated = self.conn.execute(
            "UPDATE tasks SET is_active = ?1 WHERE id = ?2",
            params![is_active, task_id],
        )?;
        if updated == 0 {
            return Err(TrackerError::not_found("task", task_id));
        }
        Ok(())
    }

    /// The scheduler's tick query: active tasks of the active period that are
    /// scheduled on `date`, whose reminder time matches `time` to the minute,
    /// and that have no ledger entry yet for `date`.
    pub fn due_reminder_tasks(
        &self,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<Vec<TaskContext>, TrackerError> {
        let sql = format!(
            "SELECT {CONTEXT_COLUMNS} {HIERARCHY_JOINS}
             LEFT JOIN task_logs tl ON tl.task_id = t.id AND tl.log_date = ?1
             WHERE p.status = 'active'
               AND t.is_active = 1
               AND (t.weekdays & ?2) > 0
               AND t.reminder_time = ?3
               AND tl.id IS NULL
             ORDER BY t.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let weekday_bit = 1i64 << date.weekday().num_days_from_sunday();
        let rows = stmt.query_map(
            params![date, weekday_bit, time.format("%H:%M").to_string()],
            Self::map_context_row,
        )?;

        let mut contexts = Vec::new();
        for row in rows {
            contexts.push(row?);
        }
        Ok(contexts)
    }

    /// Active tasks under a period.
    pub fn tasks_for_period(&self, period_id: i64) -> Result<Vec<Task>, TrackerError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} {HIERARCHY_JOINS}
             WHERE p.id = ?1 AND t.is_active = 1
             ORDER BY t.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![period_id], Self::map_task_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Active tasks under a goal.
    pub fn tasks_for_goal(&self, goal_id: i64) -> Result<Vec<Task>, TrackerError> {
        let sql = format!(
            "SELECT {TASK_COLUMNS}
             FROM tasks t
             JOIN tactics tc ON t.tactic_id = tc.id
             WHERE tc.goal_id = ?1 AND t.is_active = 1
             ORDER BY t.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![goal_id], Self::map_task_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Ids of active quantitative tasks with a total target in the active
    /// period — the redistribute-all candidates.
    pub fn quantitative_task_ids_in_active_period(&self) -> Result<Vec<i64>, TrackerError> {
        let sql = format!(
            "SELECT t.id {HIERARCHY_JOINS}
             WHERE p.status = 'active'
               AND t.is_active = 1
               AND t.metric_type != 'boolean'
               AND t.total_target IS NOT NULL
             ORDER BY t.id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            ids.push(row?);
        }
        Ok(ids)
    }

    pub(super) fn map_task_row(row: &Row<'_>) -> rusqlite::Result<Task> {
        let metric_str: String = row.get(3)?;
        let metric_type = MetricType::parse(&metric_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("unknown metric type '{}'", metric_str).into(),
            )
        })?;

        let mask: i64 = row.get(9)?;
        let time_str: String = row.get(10)?;
        let reminder_time = NaiveTime::parse_from_str(&time_str, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(&time_str, "%H:%M:%S"))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    10,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(Task {
            id: row.get(0)?,
            tactic_id: row.get(1)?,
            title: row.get(2)?,
            metric_type,
            total_target: row.get(4)?,
            unit: row.get(5)?,
            speed_per_hour: row.get(6)?,
            daily_time_minutes: row.get(7)?,
            daily_target: row.get(8)?,
            weekdays: WeekdaySchedule::from_mask(mask as u8),
            reminder_time,
            is_active: row.get(11)?,
        })
    }

    fn map_context_row(row: &Row<'_>) -> rusqlite::Result<TaskContext> {
        let task = Self::map_task_row(row)?;
        let status_str: String = row.get(18)?;
        let status = PeriodStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                18,
                rusqlite::types::Type::Text,
                format!("unknown period status '{}'", status_str).into(),
            )
        })?;

        Ok(TaskContext {
            task,
            tactic_title: row.get(12)?,
            goal_title: row.get(13)?,
            period: Period {
                id: row.get(14)?,
                name: row.get(15)?,
                start_date: row.get(16)?,
                end_date: row.get(17)?,
                status,
            },
        })
    }
}
