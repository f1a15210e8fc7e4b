//! Report Period Calculator
//!
//! Splits a project's lifetime into reporting windows. Windows are counted in
//! whole calendar months from the project's start month, so a quarterly
//! project starting in February reports Feb–Apr, May–Jul, and so on. The
//! first window starts on the project start date and the last one ends on the
//! project end date.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{Project, ReportingFrequency};
use crate::errors::{ReportError, Result};

/// One reporting window and the date its report is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub due_date: NaiveDate,
}

impl ReportPeriod {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// The finite set of reporting windows of a project.
///
/// Holds only the bounds; windows are computed on demand and every call to
/// [`ReportPeriods::iter`] starts again from the first window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPeriods {
    start: NaiveDate,
    end: NaiveDate,
    unit_months: u32,
    grace_days: u32,
    count: usize,
}

impl ReportPeriods {
    pub fn new(
        start: NaiveDate,
        end: NaiveDate,
        frequency: ReportingFrequency,
        grace_days: u32,
    ) -> Result<Self> {
        if end < start {
            return Err(ReportError::InvalidRange { start, end });
        }

        let unit_months = frequency.months();
        let months = months_between(start, end);
        let count = months.div_ceil(unit_months) as usize;

        Ok(Self {
            start,
            end,
            unit_months,
            grace_days,
            count,
        })
    }

    pub fn iter(&self) -> PeriodIter {
        PeriodIter {
            periods: self.clone(),
            index: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Windows that have started on or before `today`.
    pub fn opened_by(&self, today: NaiveDate) -> impl Iterator<Item = ReportPeriod> + '_ {
        self.iter().take_while(move |p| p.start <= today)
    }

    pub fn containing(&self, date: NaiveDate) -> Option<ReportPeriod> {
        self.iter().find(|p| p.contains(date))
    }

    fn nth_period(&self, index: usize) -> Option<ReportPeriod> {
        if index >= self.count {
            return None;
        }

        let unit = i64::from(self.unit_months);
        let first_month = month_index(self.start) + i64::try_from(index).ok()? * unit;
        let last_month = first_month + unit - 1;

        let start = if index == 0 {
            self.start
        } else {
            first_of_month(first_month)?
        };
        let end = last_of_month(last_month)?.min(self.end);
        let due_date = end.checked_add_days(Days::new(u64::from(self.grace_days)))?;

        Some(ReportPeriod {
            start,
            end,
            due_date,
        })
    }
}

impl<'a> IntoIterator for &'a ReportPeriods {
    type Item = ReportPeriod;
    type IntoIter = PeriodIter;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for ReportPeriods {
    type Item = ReportPeriod;
    type IntoIter = PeriodIter;

    fn into_iter(self) -> Self::IntoIter {
        PeriodIter {
            periods: self,
            index: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PeriodIter {
    periods: ReportPeriods,
    index: usize,
}

impl Iterator for PeriodIter {
    type Item = ReportPeriod;

    fn next(&mut self) -> Option<Self::Item> {
        let period = self.periods.nth_period(self.index)?;
        self.index += 1;
        Some(period)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.periods.count.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PeriodIter {}

/// Reporting windows for `project` at the given frequency.
pub fn periods_for(project: &Project, frequency: ReportingFrequency) -> Result<ReportPeriods> {
    ReportPeriods::new(
        project.start_date,
        project.end_date,
        frequency,
        project.grace_days,
    )
}

/// Calendar months touched by `start..=end`, inclusive of both ends.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> u32 {
    if end < start {
        return 0;
    }
    u32::try_from(month_index(end) - month_index(start) + 1).unwrap_or(u32::MAX)
}

// Months since January of year 0, negative before it.
fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn first_of_month(index: i64) -> Option<NaiveDate> {
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = u32::try_from(index.rem_euclid(12)).ok()? + 1;
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn last_of_month(index: i64) -> Option<NaiveDate> {
    first_of_month(index + 1)?.pred_opt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_first_quarter_monthly_with_default_grace() {
        let periods = ReportPeriods::new(
            date(2024, 1, 1),
            date(2024, 3, 31),
            ReportingFrequency::Monthly,
            7,
        )
        .unwrap();

        let all: Vec<_> = periods.iter().collect();
        assert_eq!(
            all,
            vec![
                ReportPeriod { start: date(2024, 1, 1), end: date(2024, 1, 31), due_date: date(2024, 2, 7) },
                ReportPeriod { start: date(2024, 2, 1), end: date(2024, 2, 29), due_date: date(2024, 3, 7) },
                ReportPeriod { start: date(2024, 3, 1), end: date(2024, 3, 31), due_date: date(2024, 4, 7) },
            ]
        );
    }

    #[test]
    fn test_end_before_start_is_invalid_range() {
        let err = ReportPeriods::new(
            date(2024, 3, 1),
            date(2024, 2, 1),
            ReportingFrequency::Monthly,
            7,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::InvalidRange { .. }));
    }

    #[test]
    fn test_mid_month_bounds_are_clamped() {
        let periods = ReportPeriods::new(
            date(2024, 1, 15),
            date(2024, 2, 10),
            ReportingFrequency::Monthly,
            0,
        )
        .unwrap();
        let all: Vec<_> = periods.iter().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].start, date(2024, 1, 15));
        assert_eq!(all[0].end, date(2024, 1, 31));
        assert_eq!(all[1].start, date(2024, 2, 1));
        assert_eq!(all[1].end, date(2024, 2, 10));
        assert_eq!(all[1].due_date, date(2024, 2, 10));
    }

    #[test]
    fn test_quarterly_count_is_ceiling_of_months() {
        // Feb 2024 .. Jun 2025 touches 17 months -> 6 quarters.
        let periods = ReportPeriods::new(
            date(2024, 2, 5),
            date(2025, 6, 30),
            ReportingFrequency::Quarterly,
            7,
        )
        .unwrap();
        assert_eq!(months_between(date(2024, 2, 5), date(2025, 6, 30)), 17);
        assert_eq!(periods.len(), 6);

        let all: Vec<_> = periods.iter().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(all[0].end, date(2024, 4, 30));
        assert_eq!(all[1].start, date(2024, 5, 1));
        assert_eq!(all[5].start, date(2025, 5, 1));
        assert_eq!(all[5].end, date(2025, 6, 30));
        for pair in all.windows(2) {
            assert!(pair[0].end < pair[1].start);
        }
    }

    #[test]
    fn test_iteration_is_restartable() {
        let periods = ReportPeriods::new(
            date(2023, 11, 1),
            date(2024, 2, 15),
            ReportingFrequency::Monthly,
            7,
        )
        .unwrap();
        let first: Vec<_> = periods.iter().collect();
        let second: Vec<_> = (&periods).into_iter().collect();
        assert_eq!(first, second);
        assert_eq!(periods.iter().len(), 4);
        assert_eq!(first[2].start, date(2024, 1, 1));
    }

    #[test]
    fn test_single_day_project_has_one_period() {
        let periods = ReportPeriods::new(
            date(2024, 5, 5),
            date(2024, 5, 5),
            ReportingFrequency::Quarterly,
            7,
        )
        .unwrap();
        let all: Vec<_> = periods.iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].due_date, date(2024, 5, 12));
    }

    #[test]
    fn test_opened_by_and_containing() {
        let periods = ReportPeriods::new(
            date(2024, 1, 1),
            date(2024, 12, 31),
            ReportingFrequency::Monthly,
            7,
        )
        .unwrap();
        assert_eq!(periods.opened_by(date(2024, 3, 1)).count(), 3);
        assert_eq!(periods.opened_by(date(2023, 12, 31)).count(), 0);
        let june = periods.containing(date(2024, 6, 17)).unwrap();
        assert_eq!(june.start, date(2024, 6, 1));
        assert!(periods.containing(date(2025, 1, 1)).is_none());
    }

    #[test]
    fn test_range_across_year_zero() {
        assert_eq!(months_between(date(-1, 12, 1), date(0, 1, 31)), 2);
        let periods = ReportPeriods::new(
            date(-1, 12, 1),
            date(0, 1, 31),
            ReportingFrequency::Monthly,
            7,
        )
        .unwrap();

        let all: Vec<_> = periods.iter().collect();
        assert_eq!(
            all,
            vec![
                ReportPeriod { start: date(-1, 12, 1), end: date(-1, 12, 31), due_date: date(0, 1, 7) },
                ReportPeriod { start: date(0, 1, 1), end: date(0, 1, 31), due_date: date(0, 2, 7) },
            ]
        );
    }
}
