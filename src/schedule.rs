//! Weekday schedule: which days of the week a task is active.
//!
//! Stored as a 7-bit mask where bit *i* is weekday *i* with Sunday = 0
//! (matching `chrono::Weekday::num_days_from_sunday`). The raw integer only
//! crosses the store boundary; everything else goes through named accessors.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

/// Mask with all seven weekday bits set.
const ALL_DAYS_MASK: u8 = 0x7f;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeekdaySchedule(u8);

impl Default for WeekdaySchedule {
    fn default() -> Self {
        Self::every_day()
    }
}

impl WeekdaySchedule {
    /// Active every day of the week.
    pub fn every_day() -> Self {
        WeekdaySchedule(ALL_DAYS_MASK)
    }

    /// Build from a raw stored mask; bits above the seventh are dropped.
    pub fn from_mask(mask: u8) -> Self {
        WeekdaySchedule(mask & ALL_DAYS_MASK)
    }

    /// The raw mask, for persistence only.
    pub fn mask(self) -> u8 {
        self.0
    }

    pub fn from_days(days: &[Weekday]) -> Self {
        let mut mask = 0u8;
        for day in days {
            mask |= 1 << day.num_days_from_sunday();
        }
        WeekdaySchedule(mask)
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_sunday()) != 0
    }

    /// Whether the task is scheduled on the given calendar date.
    pub fn is_active_on(self, date: NaiveDate) -> bool {
        self.contains(date.weekday())
    }

    /// Number of scheduled days per week.
    pub fn active_days_per_week(self) -> u32 {
        self.0.count_ones()
    }

    /// Count calendar days in `[start, end]` (inclusive) that fall on a
    /// scheduled weekday. Walks day by day: week boundaries are not uniform
    /// when the range does not align to full weeks, so this is the reference
    /// algorithm rather than an approximation.
    pub fn count_active_days_in_range(self, start: NaiveDate, end: NaiveDate) -> u32 {
        let mut count = 0;
        let mut current = start;
        while current <= end {
            if self.is_active_on(current) {
                count += 1;
            }
            current = match current.succ_opt() {
                Some(next) => next,
                None => break,
            };
        }
        count
    }

    pub fn days(self) -> Vec<Weekday> {
        const ORDER: [Weekday; 7] = [
            Weekday::Sun,
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
        ];
        ORDER.into_iter().filter(|d| self.contains(*d)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_every_day_popcount() {
        assert_eq!(WeekdaySchedule::every_day().active_days_per_week(), 7);
    }

    #[test]
    fn test_from_mask_drops_high_bits() {
        let schedule = WeekdaySchedule::from_mask(0xff);
        assert_eq!(schedule.mask(), 0x7f);
        assert_eq!(schedule.active_days_per_week(), 7);
    }

    #[test]
    fn test_from_days_roundtrip() {
        let schedule = WeekdaySchedule::from_days(&[Weekday::Mon, Weekday::Wed, Weekday::Fri]);
        assert_eq!(schedule.active_days_per_week(), 3);
        assert!(schedule.contains(Weekday::Mon));
        assert!(!schedule.contains(Weekday::Sun));
        assert_eq!(
            schedule.days(),
            vec![Weekday::Mon, Weekday::Wed, Weekday::Fri]
        );
    }

    #[test]
    fn test_is_active_on() {
        // 2024-01-01 is a Monday
        let monday_only = WeekdaySchedule::from_days(&[Weekday::Mon]);
        assert!(monday_only.is_active_on(date(2024, 1, 1)));
        assert!(!monday_only.is_active_on(date(2024, 1, 2)));
    }

    #[test]
    fn test_full_week_range_counts_seven() {
        let schedule = WeekdaySchedule::every_day();
        assert_eq!(
            schedule.count_active_days_in_range(date(2024, 1, 1), date(2024, 1, 7)),
            7
        );
    }

    #[test]
    fn test_single_weekday_range_counts_one() {
        let schedule = WeekdaySchedule::from_days(&[Weekday::Wed]);
        assert_eq!(
            schedule.count_active_days_in_range(date(2024, 1, 1), date(2024, 1, 7)),
            1
        );
    }

    #[test]
    fn test_partial_range_not_aligned_to_weeks() {
        // Mon Jan 1 .. Wed Jan 10: Mondays are Jan 1 and Jan 8
        let schedule = WeekdaySchedule::from_days(&[Weekday::Mon]);
        assert_eq!(
            schedule.count_active_days_in_range(date(2024, 1, 1), date(2024, 1, 10)),
            2
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let schedule = WeekdaySchedule::every_day();
        assert_eq!(
            schedule.count_active_days_in_range(date(2024, 1, 7), date(2024, 1, 1)),
            0
        );
    }

    #[test]
    fn test_single_day_range() {
        let schedule = WeekdaySchedule::every_day();
        assert_eq!(
            schedule.count_active_days_in_range(date(2024, 1, 3), date(2024, 1, 3)),
            1
        );
    }
}
