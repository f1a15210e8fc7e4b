//! Report period calculator tests
//!
//! Covers the monthly 2024 calendar, quarterly projects starting mid-month
//! and general properties of the generated windows.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;

use rh_reports::periods::{months_between, ReportPeriods};
use rh_reports::{ReportError, ReportingFrequency};

mod fixtures;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn windows(periods: &ReportPeriods) -> Vec<(NaiveDate, NaiveDate, NaiveDate)> {
    periods.iter().map(|p| (p.start, p.end, p.due_date)).collect()
}

#[test]
fn test_monthly_first_quarter_2024() {
    let periods = ReportPeriods::new(
        date(2024, 1, 1),
        date(2024, 3, 31),
        ReportingFrequency::Monthly,
        7,
    )
    .unwrap();

    assert_eq!(
        windows(&periods),
        vec![
            (date(2024, 1, 1), date(2024, 1, 31), date(2024, 2, 7)),
            (date(2024, 2, 1), date(2024, 2, 29), date(2024, 3, 7)),
            (date(2024, 3, 1), date(2024, 3, 31), date(2024, 4, 7)),
        ]
    );
}

#[tokio::test]
async fn test_quarterly_project_from_dataset() {
    let service = fixtures::winterization_service();
    let periods = service
        .periods_for(2, ReportingFrequency::Quarterly)
        .await
        .unwrap();

    assert_eq!(
        windows(&periods),
        vec![
            (date(2024, 1, 15), date(2024, 3, 31), date(2024, 4, 7)),
            (date(2024, 4, 1), date(2024, 6, 30), date(2024, 7, 7)),
            (date(2024, 7, 1), date(2024, 9, 30), date(2024, 10, 7)),
            (date(2024, 10, 1), date(2024, 12, 31), date(2025, 1, 7)),
        ]
    );
}

#[tokio::test]
async fn test_unknown_project() {
    let service = fixtures::winterization_service();
    let err = service
        .periods_for(99, ReportingFrequency::Monthly)
        .await
        .unwrap_err();
    assert_eq!(err, ReportError::not_found("project", 99));
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
    assert_eq!(
        err,
        ReportError::InvalidRange {
            start: date(2024, 3, 1),
            end: date(2024, 2, 1),
        }
    );
}

#[test]
fn test_single_day_project_has_one_period() {
    let periods = ReportPeriods::new(
        date(2024, 5, 20),
        date(2024, 5, 20),
        ReportingFrequency::Quarterly,
        0,
    )
    .unwrap();
    assert_eq!(
        windows(&periods),
        vec![(date(2024, 5, 20), date(2024, 5, 20), date(2024, 5, 20))]
    );
}

fn frequency() -> impl Strategy<Value = ReportingFrequency> {
    prop_oneof![
        Just(ReportingFrequency::Monthly),
        Just(ReportingFrequency::Quarterly),
    ]
}

proptest! {
    #[test]
    fn prop_periods_cover_project_without_overlap(
        start_offset in 0u64..10_000,
        length in 0u64..2_000,
        frequency in frequency(),
        grace_days in 0u32..60,
    ) {
        let start = date(2000, 1, 1) + Days::new(start_offset);
        let end = start + Days::new(length);
        let periods = ReportPeriods::new(start, end, frequency, grace_days).unwrap();
        let all: Vec<_> = periods.iter().collect();

        let expected = months_between(start, end).div_ceil(frequency.months()) as usize;
        prop_assert_eq!(all.len(), expected);
        prop_assert_eq!(periods.iter().len(), expected);

        prop_assert_eq!(all[0].start, start);
        prop_assert_eq!(all[all.len() - 1].end, end);
        for period in &all {
            prop_assert!(period.start <= period.end);
            prop_assert_eq!(period.due_date, period.end + Days::new(u64::from(grace_days)));
        }
        for pair in all.windows(2) {
            prop_assert_eq!(pair[1].start, pair[0].end + Days::new(1));
        }
    }

    #[test]
    fn prop_iteration_is_restartable(
        start_offset in 0u64..10_000,
        length in 0u64..1_000,
        frequency in frequency(),
    ) {
        let start = date(2010, 1, 1) + Days::new(start_offset);
        let periods = ReportPeriods::new(start, start + Days::new(length), frequency, 7).unwrap();
        let first: Vec<_> = periods.iter().collect();
        let second: Vec<_> = (&periods).into_iter().collect();
        prop_assert_eq!(first, second);
    }
}
