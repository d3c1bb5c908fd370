//! Pacing calculator: a task's metric configuration → its daily quota.
//!
//! Pure functions, no store access. Called on task create/update; the
//! redistribution engine overrides the estimate with
//! `remaining / remaining-active-days` as the period progresses.

use chrono::NaiveDate;

use crate::schedule::WeekdaySchedule;
use crate::types::{MetricType, Period, Task, WEEKS_PER_PERIOD};

/// Derive the daily quota, or `None` when the metric has no quota
/// (boolean tasks) or the configuration is insufficient.
///
/// Rule order:
/// 1. boolean → no daily target
/// 2. pages with speed and time budget → `speed_per_hour × minutes / 60`
/// 3. hours with time budget → `minutes / 60`
/// 4. any quantitative metric with a total target → estimate over the
///    nominal 12-week horizon: `total / (12 × active days per week)`
/// 5. otherwise → no daily target
pub fn daily_target(
    metric_type: MetricType,
    total_target: Option<f64>,
    speed_per_hour: Option<f64>,
    daily_time_minutes: Option<f64>,
    weekdays: WeekdaySchedule,
) -> Option<f64> {
    match metric_type {
        MetricType::Boolean => None,
        MetricType::Pages => {
            if let (Some(speed), Some(minutes)) = (speed_per_hour, daily_time_minutes) {
                return Some(speed * (minutes / 60.0));
            }
            estimate_from_total(total_target, weekdays)
        }
        MetricType::Hours => {
            if let Some(minutes) = daily_time_minutes {
                return Some(minutes / 60.0);
            }
            estimate_from_total(total_target, weekdays)
        }
        MetricType::Custom => estimate_from_total(total_target, weekdays),
    }
}

/// Nominal-horizon estimate, independent of how much of the period has
/// already elapsed. Redistribution keeps it accurate once days are missed.
fn estimate_from_total(total_target: Option<f64>, weekdays: WeekdaySchedule) -> Option<f64> {
    let total = total_target?;
    let total_days = u32::from(WEEKS_PER_PERIOD) * weekdays.active_days_per_week();
    if total_days == 0 {
        return None;
    }
    Some(total / f64::from(total_days))
}

/// Convenience over a full task row.
pub fn for_task(task: &Task) -> Option<f64> {
    daily_target(
        task.metric_type,
        task.total_target,
        task.speed_per_hour,
        task.daily_time_minutes,
        task.weekdays,
    )
}

/// Pro-rata share of the total target for the scheduled days elapsed so far
/// (today inclusive). `None` for boolean tasks and tasks without a total.
/// Read by dashboards to show ahead/behind status.
pub fn expected_progress(task: &Task, period: &Period, today: NaiveDate) -> Option<f64> {
    if !task.metric_type.is_quantitative() {
        return None;
    }
    let total = task.total_target?;

    let horizon = today.min(period.end_date);
    let elapsed = task
        .weekdays
        .count_active_days_in_range(period.start_date, horizon);
    let total_days = task
        .weekdays
        .count_active_days_in_range(period.start_date, period.end_date);

    if total_days == 0 {
        return Some(0.0);
    }
    Some(f64::from(elapsed) / f64::from(total_days) * total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Weekday};
    use crate::types::PeriodStatus;

    fn task(metric_type: MetricType) -> Task {
        Task {
            id: 1,
            tactic_id: 1,
            title: "Read".to_string(),
            metric_type,
            total_target: None,
            unit: None,
            speed_per_hour: None,
            daily_time_minutes: None,
            daily_target: None,
            weekdays: WeekdaySchedule::every_day(),
            reminder_time: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            is_active: true,
        }
    }

    #[test]
    fn test_boolean_never_has_daily_target() {
        let mut t = task(MetricType::Boolean);
        t.total_target = Some(100.0);
        t.speed_per_hour = Some(30.0);
        t.daily_time_minutes = Some(60.0);
        assert_eq!(for_task(&t), None);
    }

    #[test]
    fn test_pages_uses_speed_and_time() {
        let mut t = task(MetricType::Pages);
        t.speed_per_hour = Some(40.0);
        t.daily_time_minutes = Some(30.0);
        assert_eq!(for_task(&t), Some(20.0));
    }

    #[test]
    fn test_pages_missing_speed_falls_back_to_total() {
        let mut t = task(MetricType::Pages);
        t.daily_time_minutes = Some(30.0);
        t.total_target = Some(840.0);
        // 840 / (12 * 7) = 10
        assert_eq!(for_task(&t), Some(10.0));
    }

    #[test]
    fn test_hours_uses_time_budget() {
        let mut t = task(MetricType::Hours);
        t.daily_time_minutes = Some(90.0);
        assert_eq!(for_task(&t), Some(1.5));
    }

    #[test]
    fn test_custom_estimates_over_nominal_horizon() {
        let mut t = task(MetricType::Custom);
        t.total_target = Some(120.0);
        let target = for_task(&t).unwrap();
        assert!((target - 120.0 / 84.0).abs() < 1e-9);
    }

    #[test]
    fn test_custom_respects_schedule_density() {
        let mut t = task(MetricType::Custom);
        t.total_target = Some(120.0);
        t.weekdays = WeekdaySchedule::from_days(&[Weekday::Mon, Weekday::Wed]);
        // 120 / (12 * 2) = 5
        assert_eq!(for_task(&t), Some(5.0));
    }

    #[test]
    fn test_insufficient_configuration_is_none() {
        assert_eq!(for_task(&task(MetricType::Custom)), None);
        assert_eq!(for_task(&task(MetricType::Pages)), None);
        assert_eq!(for_task(&task(MetricType::Hours)), None);
    }

    #[test]
    fn test_empty_schedule_with_total_is_none() {
        let mut t = task(MetricType::Custom);
        t.total_target = Some(120.0);
        t.weekdays = WeekdaySchedule::from_mask(0);
        assert_eq!(for_task(&t), None);
    }

    #[test]
    fn test_expected_progress_midway() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let period = Period {
            id: 1,
            name: "Q1".to_string(),
            start_date: start,
            end_date: Period::end_date_for(start),
            status: PeriodStatus::Active,
        };
        let mut t = task(MetricType::Custom);
        t.total_target = Some(84.0);
        // 42 of 84 scheduled days elapsed → half the target expected
        let today = start + chrono::Duration::days(41);
        let expected = expected_progress(&t, &period, today).unwrap();
        assert!((expected - 42.0).abs() < 1e-9);
    }

    #[test]
    fn test_expected_progress_boolean_is_none() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let period = Period {
            id: 1,
            name: "Q1".to_string(),
            start_date: start,
            end_date: Period::end_date_for(start),
            status: PeriodStatus::Active,
        };
        assert_eq!(
            expected_progress(&task(MetricType::Boolean), &period, start),
            None
        );
    }
}
