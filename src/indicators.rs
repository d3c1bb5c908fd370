//! Lead and lag indicators, recomputed from the ledger on demand.
//!
//! Lead is short-horizon: completion rate over one week's entries. Lag is
//! target-horizon: per-task progress toward the total, averaged. Per-task
//! lag contributions are capped at 100 before averaging so overshoot on one
//! task cannot inflate a goal's mean.

use chrono::NaiveDate;

use crate::db::TrackerDb;
use crate::error::TrackerError;
use crate::types::{Goal, Period, WEEKS_PER_PERIOD};

/// Lag summary for one goal.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalProgress {
    pub goal_id: i64,
    pub title: String,
    pub lag_percent: f64,
    pub task_count: usize,
}

/// A period-level snapshot: where we are against the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodSummary {
    pub period_id: i64,
    pub period_name: String,
    pub current_week: u8,
    pub days_remaining: i64,
    pub lead_percent: f64,
    pub lag_percent: f64,
    pub goals: Vec<GoalProgress>,
}

/// Completion rate over one week's entries for all tasks in a period.
/// 0 when the week has no entries.
pub fn lead_indicator(
    db: &TrackerDb,
    period_id: i64,
    week_number: u8,
) -> Result<f64, TrackerError> {
    let (total, completed) = db.week_counts(period_id, week_number)?;
    Ok(rate(completed, total))
}

/// Same as [`lead_indicator`], scoped to one goal's tasks.
pub fn lead_indicator_for_goal(
    db: &TrackerDb,
    goal_id: i64,
    week_number: u8,
) -> Result<f64, TrackerError> {
    let (total, completed) = db.week_counts_for_goal(goal_id, week_number)?;
    Ok(rate(completed, total))
}

/// Mean per-task progress toward target across a set of tasks.
///
/// Boolean tasks contribute their completion rate; quantitative tasks with a
/// total target contribute banked progress over that total, capped at 100.
/// Tasks with no entries and no total target are excluded from the mean, not
/// counted as zero. Returns `(percent, contributing_task_count)`.
fn lag_over_tasks(db: &TrackerDb, task_ids: &[i64]) -> Result<(f64, usize), TrackerError> {
    let mut sum = 0.0;
    let mut contributing = 0usize;

    for &task_id in task_ids {
        let task = match db.get_task(task_id)? {
            Some(t) => t,
            None => continue,
        };

        let contribution = if task.metric_type.is_quantitative() {
            match task.total_target {
                Some(total) if total > 0.0 => {
                    let progress = db.max_progress(task_id)?;
                    Some((100.0 * progress / total).min(100.0))
                }
                _ => {
                    // No total to measure against: fall back to completion
                    // rate if the task has any entries at all.
                    let (entries, completed) = db.log_counts(task_id)?;
                    (entries > 0).then(|| rate(completed, entries))
                }
            }
        } else {
            let (entries, completed) = db.log_counts(task_id)?;
            (entries > 0).then(|| rate(completed, entries))
        };

        if let Some(c) = contribution {
            sum += c;
            contributing += 1;
        }
    }

    if contributing == 0 {
        return Ok((0.0, 0));
    }
    Ok((sum / contributing as f64, contributing))
}

/// Mean progress toward target across every task in the period.
pub fn lag_indicator(db: &TrackerDb, period_id: i64) -> Result<f64, TrackerError> {
    let ids: Vec<i64> = db
        .tasks_for_period(period_id)?
        .into_iter()
        .map(|t| t.id)
        .collect();
    Ok(lag_over_tasks(db, &ids)?.0)
}

/// Lag summary for one goal.
pub fn goal_progress(db: &TrackerDb, goal: &Goal) -> Result<GoalProgress, TrackerError> {
    let ids: Vec<i64> = db
        .tasks_for_goal(goal.id)?
        .into_iter()
        .map(|t| t.id)
        .collect();
    let (percent, count) = lag_over_tasks(db, &ids)?;
    Ok(GoalProgress {
        goal_id: goal.id,
        title: goal.title.clone(),
        lag_percent: percent,
        task_count: count,
    })
}

/// Lag summaries for every goal in a period, in creation order.
pub fn goals_progress(db: &TrackerDb, period_id: i64) -> Result<Vec<GoalProgress>, TrackerError> {
    let goals = db.goals_for_period(period_id)?;
    let mut out = Vec::with_capacity(goals.len());
    for goal in &goals {
        out.push(goal_progress(db, goal)?);
    }
    Ok(out)
}

/// Lead indicator for each of the twelve weeks, in order. Weeks with no
/// entries (including future weeks) read as 0.
pub fn weekly_chart(db: &TrackerDb, period_id: i64) -> Result<Vec<f64>, TrackerError> {
    let mut weeks = Vec::with_capacity(WEEKS_PER_PERIOD as usize);
    for week in 1..=WEEKS_PER_PERIOD {
        weeks.push(lead_indicator(db, period_id, week)?);
    }
    Ok(weeks)
}

/// Full snapshot for a period as of `today`.
pub fn period_summary(
    db: &TrackerDb,
    period: &Period,
    today: NaiveDate,
) -> Result<PeriodSummary, TrackerError> {
    let current_week = period.week_number(today);
    Ok(PeriodSummary {
        period_id: period.id,
        period_name: period.name.clone(),
        current_week,
        days_remaining: period.days_remaining(today),
        lead_percent: lead_indicator(db, period.id, current_week)?,
        lag_percent: lag_indicator(db, period.id)?,
        goals: goals_progress(db, period.id)?,
    })
}

fn rate(completed: i64, total: i64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    100.0 * completed as f64 / total as f64
}
