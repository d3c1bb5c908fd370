//! Daily target redistribution: spread the remaining total over the
//! remaining scheduled days.
//!
//! Runs after a skip, or in bulk for every quantitative task in the active
//! period. Only tasks with a total target participate; boolean habits have
//! nothing to spread.

use chrono::NaiveDate;

use crate::db::TrackerDb;
use crate::error::TrackerError;

/// What a redistribution pass decided for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct RedistributionOutcome {
    pub task_id: i64,
    pub previous_target: Option<f64>,
    pub new_target: f64,
    pub remaining_total: f64,
    pub remaining_days: u32,
}

/// Recompute one task's daily target from what is left to do.
///
/// Returns `Ok(None)` when there is nothing to redistribute: the task is not
/// quantitative, has no total target, is already at or past its total, or has
/// no scheduled days left (`today` through the period end, inclusive). The
/// persisted target only changes on `Ok(Some(_))`.
pub fn redistribute(
    db: &TrackerDb,
    task_id: i64,
    today: NaiveDate,
) -> Result<Option<RedistributionOutcome>, TrackerError> {
    let ctx = db
        .get_task_context(task_id)?
        .ok_or_else(|| TrackerError::not_found("task", task_id))?;

    if !ctx.task.metric_type.is_quantitative() {
        return Ok(None);
    }
    let total = match ctx.task.total_target {
        Some(t) => t,
        None => return Ok(None),
    };

    let progress = db.max_progress(task_id)?;
    let remaining_total = total - progress;
    if remaining_total <= 0.0 {
        return Ok(None);
    }

    let remaining_days = ctx
        .task
        .weekdays
        .count_active_days_in_range(today, ctx.period.end_date);
    if remaining_days == 0 {
        return Ok(None);
    }

    let new_target = remaining_total / remaining_days as f64;
    db.update_daily_target(task_id, Some(new_target))?;

    log::info!(
        "Redistributed task {}: {} remaining over {} days, target {:.2}",
        task_id,
        remaining_total,
        remaining_days,
        new_target
    );

    Ok(Some(RedistributionOutcome {
        task_id,
        previous_target: ctx.task.daily_target,
        new_target,
        remaining_total,
        remaining_days,
    }))
}

/// Redistribute every quantitative task in the active period.
///
/// A failure on one task is logged and the pass continues; the return value
/// holds only the tasks whose targets actually changed.
pub fn redistribute_all(
    db: &TrackerDb,
    today: NaiveDate,
) -> Result<Vec<RedistributionOutcome>, TrackerError> {
    let task_ids = db.quantitative_task_ids_in_active_period()?;

    let mut outcomes = Vec::new();
    for task_id in task_ids {
        match redistribute(db, task_id, today) {
            Ok(Some(outcome)) => outcomes.push(outcome),
            Ok(None) => {}
            Err(e) => log::warn!("Redistribution failed for task {}: {}", task_id, e),
        }
    }
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_utils::{seed_hierarchy, seed_quantitative_task, seed_task, test_db};
    use crate::ledger;
    use crate::types::MetricType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_redistribute_spreads_remaining_over_remaining_days() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        let task = seed_quantitative_task(&db, tactic_id, 100.0);

        db.upsert_log(task.id, date(2024, 1, 10), 2, true, None, 40.0)
            .expect("progress");

        // Mar 19 .. Mar 24 inclusive: 6 days left
        let outcome = redistribute(&db, task.id, date(2024, 3, 19))
            .expect("redistribute")
            .expect("changed");

        assert_eq!(outcome.remaining_days, 6);
        assert!((outcome.remaining_total - 60.0).abs() < 1e-9);
        assert!((outcome.new_target - 10.0).abs() < 1e-9);

        let updated = db.get_task(task.id).expect("get").expect("task");
        assert!((updated.daily_target.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_redistribute_noop_when_target_met() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        let task = seed_quantitative_task(&db, tactic_id, 100.0);
        let original = task.daily_target;

        db.upsert_log(task.id, date(2024, 1, 10), 2, true, None, 100.0)
            .expect("progress");

        let outcome = redistribute(&db, task.id, date(2024, 2, 1)).expect("redistribute");
        assert!(outcome.is_none());

        let updated = db.get_task(task.id).expect("get").expect("task");
        assert_eq!(updated.daily_target, original, "target untouched");
    }

    #[test]
    fn test_redistribute_noop_for_boolean() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        let task = seed_task(&db, tactic_id, MetricType::Boolean);

        let outcome = redistribute(&db, task.id, date(2024, 1, 2)).expect("redistribute");
        assert!(outcome.is_none());
    }

    #[test]
    fn test_redistribute_noop_past_period_end() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        let task = seed_quantitative_task(&db, tactic_id, 100.0);

        let outcome = redistribute(&db, task.id, date(2024, 3, 25)).expect("redistribute");
        assert!(outcome.is_none());
    }

    #[test]
    fn test_consecutive_skips_compound_the_target() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        // 840 over 84 days: 10/day to start
        let task = seed_quantitative_task(&db, tactic_id, 840.0);

        // Three consecutive skips starting on day 2; no progress is ever
        // banked, so each pass divides 840 by one fewer remaining day
        // (83, then 82, then 81).
        ledger::record_skip(&db, task.id, date(2024, 1, 2), date(2024, 1, 2)).expect("skip 1");
        let t1 = db.get_task(task.id).unwrap().unwrap().daily_target.unwrap();
        assert!((t1 - 840.0 / 83.0).abs() < 1e-9);

        ledger::record_skip(&db, task.id, date(2024, 1, 3), date(2024, 1, 3)).expect("skip 2");
        let t2 = db.get_task(task.id).unwrap().unwrap().daily_target.unwrap();
        assert!((t2 - 840.0 / 82.0).abs() < 1e-9);

        ledger::record_skip(&db, task.id, date(2024, 1, 4), date(2024, 1, 4)).expect("skip 3");
        let t3 = db.get_task(task.id).unwrap().unwrap().daily_target.unwrap();
        assert!((t3 - 840.0 / 81.0).abs() < 1e-9);

        assert!(t1 < t2 && t2 < t3);
    }

    #[test]
    fn test_redistribute_respects_weekday_schedule() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        let task = seed_quantitative_task(&db, tactic_id, 100.0);
        // Mondays only (bit 1)
        db.conn_ref()
            .execute(
                "UPDATE tasks SET weekdays = 2 WHERE id = ?1",
                [task.id],
            )
            .expect("narrow schedule");

        // Jan 1 (Mon) .. Mar 24: Mondays Jan 1..Mar 18 = 12 of them
        let outcome = redistribute(&db, task.id, date(2024, 1, 1))
            .expect("redistribute")
            .expect("changed");
        assert_eq!(outcome.remaining_days, 12);
        assert!((outcome.new_target - 100.0 / 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_redistribute_all_touches_only_quantitative_tasks() {
        let db = test_db();
        let (_, _, tactic_id) = seed_hierarchy(&db);
        let quantitative = seed_quantitative_task(&db, tactic_id, 100.0);
        let boolean = seed_task(&db, tactic_id, MetricType::Boolean);

        let outcomes = redistribute_all(&db, date(2024, 2, 1)).expect("pass");
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].task_id, quantitative.id);

        let untouched = db.get_task(boolean.id).expect("get").expect("task");
        assert_eq!(untouched.daily_target, None);
    }

    #[test]
    fn test_redistribute_unknown_task() {
        let db = test_db();
        let result = redistribute(&db, 999, date(2024, 1, 1));
        assert!(matches!(result, Err(TrackerError::NotFound { .. })));
    }
}
