//! Domain types for the planning hierarchy and the progress ledger.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::WeekdaySchedule;

/// Weeks in a tracking period.
pub const WEEKS_PER_PERIOD: u8 = 12;

/// Days from a period's start to its end date, inclusive bounds (84 days total).
pub const PERIOD_SPAN_DAYS: i64 = 83;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    Active,
    Completed,
    Cancelled,
}

impl PeriodStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PeriodStatus::Active => "active",
            PeriodStatus::Completed => "completed",
            PeriodStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(PeriodStatus::Active),
            "completed" => Some(PeriodStatus::Completed),
            "cancelled" => Some(PeriodStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricType {
    /// Did-it-or-not; progress is the completion ratio, never a quantity.
    Boolean,
    /// Pages read, paced by reading speed and daily time budget.
    Pages,
    /// Hours spent, paced by daily time budget.
    Hours,
    /// Arbitrary unit paced against a total target.
    Custom,
}

impl MetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            MetricType::Boolean => "boolean",
            MetricType::Pages => "pages",
            MetricType::Hours => "hours",
            MetricType::Custom => "custom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "boolean" => Some(MetricType::Boolean),
            "pages" => Some(MetricType::Pages),
            "hours" => Some(MetricType::Hours),
            "custom" => Some(MetricType::Custom),
            _ => None,
        }
    }

    pub fn is_quantitative(self) -> bool {
        !matches!(self, MetricType::Boolean)
    }
}

/// A fixed 12-week tracking cycle. At most one period is active system-wide,
/// enforced by a partial unique index in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Period {
    pub id: i64,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: PeriodStatus,
}

impl Period {
    /// End date implied by a start date: start + 83 days, exactly 12 weeks.
    pub fn end_date_for(start_date: NaiveDate) -> NaiveDate {
        start_date + Duration::days(PERIOD_SPAN_DAYS)
    }

    /// Week number for a log date, clamped to `[1, 12]`. Dates before the
    /// period start clamp to week 1, dates past the end to week 12.
    pub fn week_number(&self, date: NaiveDate) -> u8 {
        let days = (date - self.start_date).num_days();
        let week = days.div_euclid(7) + 1;
        week.clamp(1, i64::from(WEEKS_PER_PERIOD)) as u8
    }

    /// Calendar window of a week: `[start + 7·(week−1), +6 days]`.
    pub fn week_window(&self, week: u8) -> (NaiveDate, NaiveDate) {
        let week = week.clamp(1, WEEKS_PER_PERIOD);
        let start = self.start_date + Duration::days(7 * (i64::from(week) - 1));
        (start, start + Duration::days(6))
    }

    pub fn days_remaining(&self, today: NaiveDate) -> i64 {
        (self.end_date - today).num_days().max(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Goal {
    pub id: i64,
    pub period_id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tactic {
    pub id: i64,
    pub goal_id: i64,
    pub title: String,
}

/// A recurring task under a tactic.
///
/// `daily_target` is derived (pacing calculator) and cached on the row; it is
/// recomputed on create/update and whenever redistribution fires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub tactic_id: i64,
    pub title: String,
    pub metric_type: MetricType,
    pub total_target: Option<f64>,
    pub unit: Option<String>,
    pub speed_per_hour: Option<f64>,
    pub daily_time_minutes: Option<f64>,
    pub daily_target: Option<f64>,
    pub weekdays: WeekdaySchedule,
    pub reminder_time: NaiveTime,
    pub is_active: bool,
}

/// Fields supplied when creating a task; `daily_target` is computed, not given.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub tactic_id: i64,
    pub title: String,
    pub metric_type: MetricType,
    pub total_target: Option<f64>,
    pub unit: Option<String>,
    pub speed_per_hour: Option<f64>,
    pub daily_time_minutes: Option<f64>,
    pub weekdays: WeekdaySchedule,
    pub reminder_time: NaiveTime,
}

/// A task joined with its owning tactic, goal and period. The ledger,
/// redistribution engine and scheduler all need the period context.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub task: Task,
    pub tactic_title: String,
    pub goal_title: String,
    pub period: Period,
}

/// One ledger row: the result of a task on one calendar day.
/// `(task_id, log_date)` is unique; writes are upserts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLog {
    pub id: i64,
    pub task_id: i64,
    pub log_date: NaiveDate,
    pub week_number: u8,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub accumulated_progress: f64,
}

/// A registered delivery target for reminders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipient {
    pub id: i64,
    pub chat_id: String,
    pub username: Option<String>,
    pub is_active: bool,
}
