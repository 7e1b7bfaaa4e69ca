//! Cadence matrix and scheduling properties.

use chrono::{Datelike, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use proptest::prelude::*;
use rstest::rstest;

use super::cadence::{advance, advance_date, first_run_date, local_date, run_instant};
use super::rule::{Cadence, RuleOptions};
use crate::calendar::{days_in_month, weekday_ordinal};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn eom() -> RuleOptions {
    RuleOptions {
        end_of_month: true,
        ..RuleOptions::default()
    }
}

fn third_friday() -> RuleOptions {
    RuleOptions {
        nth_week: Some(3),
        nth_weekday: Some(Weekday::Fri),
        ..RuleOptions::default()
    }
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (1990i32..2100, 1u32..=12, 1u32..=31)
        .prop_map(|(y, m, day)| NaiveDate::from_ymd_opt(y, m, day.min(days_in_month(y, m))).unwrap())
}

fn arb_weekday() -> impl Strategy<Value = Weekday> {
    (0u8..7).prop_map(|n| Weekday::try_from(n).unwrap())
}

#[rstest]
#[case(d(2025, 1, 31), d(2025, 2, 28))]
#[case(d(2025, 2, 28), d(2025, 3, 31))]
#[case(d(2025, 3, 31), d(2025, 4, 30))]
#[case(d(2024, 1, 31), d(2024, 2, 29))]
#[case(d(2025, 12, 31), d(2026, 1, 31))]
#[case(d(2025, 1, 15), d(2025, 2, 28))]
fn test_end_of_month(#[case] from: NaiveDate, #[case] expected: NaiveDate) {
    assert_eq!(advance_date(from, Cadence::Monthly, &eom()), Some(expected));
}

#[rstest]
#[case(d(2025, 1, 15), 31, d(2025, 2, 28))]
#[case(d(2025, 2, 28), 31, d(2025, 3, 31))]
#[case(d(2024, 1, 10), 30, d(2024, 2, 29))]
#[case(d(2025, 11, 15), 15, d(2025, 12, 15))]
#[case(d(2025, 12, 15), 15, d(2026, 1, 15))]
fn test_day_of_month(#[case] from: NaiveDate, #[case] day: u32, #[case] expected: NaiveDate) {
    let options = RuleOptions {
        day_of_month: Some(day),
        ..RuleOptions::default()
    };
    assert_eq!(advance_date(from, Cadence::Monthly, &options), Some(expected));
}

#[rstest]
#[case(d(2025, 1, 17), d(2025, 2, 21))]
#[case(d(2025, 2, 21), d(2025, 3, 21))]
#[case(d(2025, 12, 19), d(2026, 1, 16))]
fn test_third_friday(#[case] from: NaiveDate, #[case] expected: NaiveDate) {
    assert_eq!(advance_date(from, Cadence::Monthly, &third_friday()), Some(expected));
}

#[test]
fn test_monthly_precedence() {
    // end_of_month wins over day_of_month, which wins over nth weekday.
    let all = RuleOptions {
        end_of_month: true,
        day_of_month: Some(10),
        nth_week: Some(1),
        nth_weekday: Some(Weekday::Mon),
        ..RuleOptions::default()
    };
    assert_eq!(advance_date(d(2025, 1, 5), Cadence::Monthly, &all), Some(d(2025, 2, 28)));

    let day_and_nth = RuleOptions {
        end_of_month: false,
        ..all
    };
    assert_eq!(
        advance_date(d(2025, 1, 5), Cadence::Monthly, &day_and_nth),
        Some(d(2025, 2, 10))
    );
}

#[rstest]
#[case(d(2025, 1, 31), d(2025, 2, 28))]
#[case(d(2025, 2, 28), d(2025, 3, 28))]
#[case(d(2025, 12, 5), d(2026, 1, 5))]
fn test_same_day_next_month(#[case] from: NaiveDate, #[case] expected: NaiveDate) {
    assert_eq!(
        advance_date(from, Cadence::Monthly, &RuleOptions::default()),
        Some(expected)
    );
}

#[rstest]
#[case(d(2024, 2, 29), d(2025, 2, 28))]
#[case(d(2025, 6, 30), d(2026, 6, 30))]
fn test_annual(#[case] from: NaiveDate, #[case] expected: NaiveDate) {
    assert_eq!(
        advance_date(from, Cadence::Annual, &RuleOptions::default()),
        Some(expected)
    );
}

#[test]
fn test_weekly_interval_and_weekday() {
    let fortnightly = RuleOptions {
        interval_weeks: Some(2),
        ..RuleOptions::default()
    };
    assert_eq!(advance_date(d(2025, 1, 1), Cadence::Weekly, &fortnightly), Some(d(2025, 1, 15)));
    assert_eq!(
        advance_date(d(2025, 1, 1), Cadence::Weekly, &RuleOptions::default()),
        Some(d(2025, 1, 8))
    );

    // 2025-01-03 is a Friday: the next Friday is a full week away.
    let fridays = RuleOptions {
        weekday: Some(Weekday::Fri),
        ..RuleOptions::default()
    };
    assert_eq!(advance_date(d(2025, 1, 3), Cadence::Weekly, &fridays), Some(d(2025, 1, 10)));
    assert_eq!(advance_date(d(2025, 1, 6), Cadence::Weekly, &fridays), Some(d(2025, 1, 10)));
}

#[test]
fn test_daily_ignores_interval_days() {
    let options = RuleOptions {
        interval_days: Some(5),
        ..RuleOptions::default()
    };
    assert_eq!(advance_date(d(2025, 12, 31), Cadence::Daily, &options), Some(d(2026, 1, 1)));
}

#[test]
fn test_first_run_date() {
    // Created on the start date: the schedule starts one step later.
    assert_eq!(
        first_run_date(d(2025, 1, 31), d(2025, 1, 31), Cadence::Monthly, &eom()),
        Some(d(2025, 2, 28))
    );
    // Future start date is kept.
    assert_eq!(
        first_run_date(d(2025, 3, 1), d(2025, 1, 31), Cadence::Monthly, &eom()),
        Some(d(2025, 3, 1))
    );
}

#[test]
fn test_time_zone_midnight_alignment() {
    let tz: Tz = "America/New_York".parse().unwrap();
    // Midnight in New York is 05:00 UTC in winter and 04:00 UTC in summer.
    let winter = run_instant(d(2025, 1, 31), Cadence::Monthly, Some(tz)).unwrap();
    assert_eq!(winter, Utc.with_ymd_and_hms(2025, 1, 31, 5, 0, 0).unwrap());

    let next = advance(winter, Cadence::Monthly, &eom(), Some(tz)).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 2, 28, 5, 0, 0).unwrap());
    let after = advance(next, Cadence::Monthly, &eom(), Some(tz)).unwrap();
    assert_eq!(after, Utc.with_ymd_and_hms(2025, 3, 31, 4, 0, 0).unwrap());
    assert_eq!(local_date(after, Cadence::Monthly, Some(tz)), d(2025, 3, 31));
}

#[test]
fn test_daily_skips_time_zone() {
    let tz: Tz = "Asia/Tokyo".parse().unwrap();
    let at = run_instant(d(2025, 1, 1), Cadence::Daily, Some(tz)).unwrap();
    assert_eq!(at.hour(), 0);
    assert_eq!(at.date_naive(), d(2025, 1, 1));
    let next = advance(at, Cadence::Daily, &RuleOptions::default(), Some(tz)).unwrap();
    assert_eq!(next, Utc.with_ymd_and_hms(2025, 1, 2, 0, 0, 0).unwrap());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Daily advance is always the next calendar day.
    #[test]
    fn prop_daily_is_next_day(date in arb_date()) {
        let next = advance_date(date, Cadence::Daily, &RuleOptions::default()).unwrap();
        prop_assert_eq!(next, date.succ_opt().unwrap());
    }

    /// End-of-month runs land on the last day of the following month.
    #[test]
    fn prop_end_of_month_is_last_day(date in arb_date()) {
        let next = advance_date(date, Cadence::Monthly, &eom()).unwrap();
        prop_assert_eq!(next.day(), days_in_month(next.year(), next.month()));
        prop_assert!(next > date);
    }

    /// Nth-weekday runs are always on the weekday, in the 3rd occurrence.
    #[test]
    fn prop_third_friday(date in arb_date()) {
        let next = advance_date(date, Cadence::Monthly, &third_friday()).unwrap();
        prop_assert_eq!(next.weekday(), Weekday::Fri);
        prop_assert_eq!(weekday_ordinal(next), 3);
    }

    /// Weekly-on-weekday runs move 1 to 7 days forward and hit the weekday.
    #[test]
    fn prop_weekly_weekday_never_zero(date in arb_date(), weekday in arb_weekday()) {
        let options = RuleOptions { weekday: Some(weekday), ..RuleOptions::default() };
        let next = advance_date(date, Cadence::Weekly, &options).unwrap();
        let gap = (next - date).num_days();
        prop_assert!((1..=7).contains(&gap));
        prop_assert_eq!(next.weekday(), weekday);
    }

    /// Every cadence strictly moves forward.
    #[test]
    fn prop_advance_is_monotonic(date in arb_date(), day in 1u32..=31) {
        let options = RuleOptions { day_of_month: Some(day), ..RuleOptions::default() };
        for cadence in [Cadence::Daily, Cadence::Weekly, Cadence::Monthly, Cadence::Annual] {
            prop_assert!(advance_date(date, cadence, &options).unwrap() > date);
        }
    }
}
