//! Calendar arithmetic on explicit (year, month, day) values.
//!
//! Every month shift goes through [`YearMonth`] and every day-of-month
//! goes through [`clamp_to_month_length`], so month and year rollovers
//! never overflow into the following month.
//!
//! Functions return `Option` only for dates outside chrono's supported
//! range (roughly ±262,000 years).

use chrono::{Datelike, Duration, NaiveDate, Weekday};


/// A calendar month of a specific year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    /// Proleptic Gregorian year.
    pub year: i32,
    /// Month, 1-12.
    pub month: u32,
}

impl YearMonth {
    /// Creates a year-month, returning `None` for a month outside 1-12.
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Option<Self> {
        if month >= 1 && month <= 12 {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The month containing `date`.
    #[must_use]
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Shifts by a signed number of months, rolling the year as needed.
    #[must_use]
    pub fn plus_months(self, months: i32) -> Self {
        // Zero-based month index keeps the arithmetic in one place.
        let index = i64::from(self.year) * 12 + i64::from(self.month) - 1 + i64::from(months);
        let year = index.div_euclid(12);
        let month = index.rem_euclid(12) + 1;
        Self {
            year: i32::try_from(year).unwrap_or(if year < 0 { i32::MIN } else { i32::MAX }),
            month: u32::try_from(month).unwrap_or(1),
        }
    }

    /// The following month.
    #[must_use]
    pub fn next(self) -> Self {
        self.plus_months(1)
    }

    /// Number of days in this month.
    #[must_use]
    pub fn days(self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// First day of the month.
    #[must_use]
    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    /// Last day of the month.
    #[must_use]
    pub fn last_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.days())
    }

    /// The given day of this month, clamped to the month length.
    #[must_use]
    pub fn day(self, day: u32) -> Option<NaiveDate> {
        clamp_to_month_length(self.year, self.month, day)
    }

    /// `YYYY-MM` rendering used in idempotency references.
    #[must_use]
    pub fn label(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Returns true for Gregorian leap years.
#[must_use]
pub const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Number of days in the given month (0 for an invalid month).
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 0,
    }
}

/// Builds a date, clamping `day` into `1..=days_in_month`.
///
/// This is the only place a day-of-month is fitted to a month.
#[must_use]
pub fn clamp_to_month_length(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let length = days_in_month(year, month);
    if length == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day.clamp(1, length))
}

/// Adds whole calendar days.
#[must_use]
pub fn add_days(date: NaiveDate, days: i64) -> Option<NaiveDate> {
    date.checked_add_signed(Duration::try_days(days)?)
}

/// Adds months keeping the day of month, clamped to the target month.
///
/// Jan 31 + 1 month is Feb 28 (or 29), never Mar 3.
#[must_use]
pub fn add_months_clamped(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    YearMonth::of(date).plus_months(months).day(date.day())
}

/// Adds years keeping month and day; Feb 29 clamps to Feb 28.
#[must_use]
pub fn add_years_clamped(date: NaiveDate, years: i32) -> Option<NaiveDate> {
    clamp_to_month_length(date.year().checked_add(years)?, date.month(), date.day())
}

/// Next occurrence of `weekday` strictly after `date` (1 to 7 days forward).
#[must_use]
pub fn next_weekday_after(date: NaiveDate, weekday: Weekday) -> Option<NaiveDate> {
    let current = i64::from(date.weekday().num_days_from_monday());
    let target = i64::from(weekday.num_days_from_monday());
    let mut ahead = (target - current).rem_euclid(7);
    if ahead == 0 {
        ahead = 7;
    }
    add_days(date, ahead)
}

/// The `nth` occurrence of `weekday` in a month.
///
/// `nth` below 1 is treated as 1. When the month has fewer occurrences
/// (e.g. a 5th Friday) the last occurrence is returned, so the result is
/// always inside the month and always on `weekday`.
#[must_use]
pub fn nth_weekday_of_month(month: YearMonth, nth: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first = month.first_day()?;
    let offset = (i64::from(weekday.num_days_from_monday())
        - i64::from(first.weekday().num_days_from_monday()))
    .rem_euclid(7);
    let first_match = add_days(first, offset)?;

    let mut weeks = i64::from(nth.max(1) - 1);
    let last = month.last_day()?;
    loop {
        let candidate = add_days(first_match, weeks * 7)?;
        if candidate <= last || weeks == 0 {
            return Some(candidate);
        }
        weeks -= 1;
    }
}

/// Which occurrence of its weekday a date is within its month (1-based).
#[must_use]
pub fn weekday_ordinal(date: NaiveDate) -> u32 {
    (date.day() - 1) / 7 + 1
}
