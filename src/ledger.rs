//! Progress ledger: completion and skip events under the one-log-per-day
//! invariant.
//!
//! `accumulated_progress` is monotonically non-decreasing across increasing
//! log dates for a task, except when a caller supplies an explicit progress
//! value. A skip carries the prior maximum forward unchanged — it never
//! erases banked progress — and, for quantitative tasks with a total target,
//! triggers redistribution synchronously.

use chrono::{NaiveDate, Utc};

use crate::db::TrackerDb;
use crate::error::TrackerError;
use crate::redistribution;
use crate::types::{TaskContext, TaskLog};

/// Record a completed day.
///
/// The new accumulated progress is the prior maximum (entries strictly before
/// `date`) plus `explicit_progress` when given, else the task's daily target,
/// else 0. Boolean tasks skip the accumulation arithmetic entirely. Repeat
/// calls for the same day overwrite the existing row.
pub fn record_completion(
    db: &TrackerDb,
    task_id: i64,
    date: NaiveDate,
    explicit_progress: Option<f64>,
) -> Result<TaskLog, TrackerError> {
    let ctx = load_context(db, task_id)?;
    let week = ctx.period.week_number(date);

    let accumulated = if ctx.task.metric_type.is_quantitative() {
        let prior = db.max_progress_before(task_id, date)?;
        let delta = explicit_progress
            .or(ctx.task.daily_target)
            .unwrap_or(0.0);
        prior + delta
    } else {
        0.0
    };

    db.upsert_log(task_id, date, week, true, Some(Utc::now()), accumulated)
}

/// Record a skipped day.
///
/// The prior maximum is carried forward unchanged. For quantitative tasks
/// with a total target, redistribution runs synchronously afterward; a
/// redistribution failure is logged and the previous daily target stays in
/// place (fail-safe, not fail-fatal).
pub fn record_skip(
    db: &TrackerDb,
    task_id: i64,
    date: NaiveDate,
    today: NaiveDate,
) -> Result<TaskLog, TrackerError> {
    let ctx = load_context(db, task_id)?;
    let week = ctx.period.week_number(date);

    let carried = db.max_progress_before(task_id, date)?;
    let log = db.upsert_log(task_id, date, week, false, None, carried)?;

    if ctx.task.metric_type.is_quantitative() && ctx.task.total_target.is_some() {
        if let Err(e) = redistribution::redistribute(db, task_id, today) {
            log::warn!(
                "Redistribution after skip failed for task {}: {}",
                task_id,
                e
            );
        }
    }

    Ok(log)
}

/// Running baseline strictly before `date`.
pub fn progress_as_of(db: &TrackerDb, task_id: i64, date: NaiveDate) -> Result<f64, TrackerError> {
    db.max_progress_before(task_id, date)
}

/// Overall banked progress for the task.
pub fn current_progress(db: &TrackerDb, task_id: i64) -> Result<f64, TrackerError> {
    db.max_progress(task_id)
}

fn load_context(db: &TrackerDb, task_id: i64) -> Result<TaskContext, TrackerError> {
    db.get_task_context(task_id)?
        .ok_or_else(|| TrackerError::not_found("task", task_id))
}
