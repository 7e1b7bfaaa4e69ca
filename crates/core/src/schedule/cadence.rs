//! When a rule runs next.
//!
//! Run dates are computed on plain calendar dates through
//! [`crate::calendar`]. A rule's `next_run_at` instant is midnight of its
//! run date: in the tenant's time zone when one is configured, UTC
//! otherwise. Daily rules always use UTC and step exactly one day.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::rule::{Cadence, RuleOptions};
use crate::calendar::{
    YearMonth, add_days, add_months_clamped, add_years_clamped, next_weekday_after,
    nth_weekday_of_month,
};

/// The run date following `date`.
///
/// Returns `None` only past chrono's supported range.
#[must_use]
pub fn advance_date(date: NaiveDate, cadence: Cadence, options: &RuleOptions) -> Option<NaiveDate> {
    match cadence {
        // interval_days is ignored: one day per due tick.
        Cadence::Daily => add_days(date, 1),
        Cadence::Weekly => match options.weekday {
            Some(weekday) => next_weekday_after(date, weekday),
            None => add_days(date, 7 * i64::from(options.interval_weeks.unwrap_or(1).max(1))),
        },
        Cadence::Monthly => {
            let target = YearMonth::of(date).next();
            if options.end_of_month {
                target.last_day()
            } else if let Some(day) = options.day_of_month {
                target.day(day)
            } else if let (Some(nth), Some(weekday)) = (options.nth_week, options.nth_weekday) {
                nth_weekday_of_month(target, nth, weekday)
            } else {
                add_months_clamped(date, 1)
            }
        }
        Cadence::Annual => add_years_clamped(date, 1),
    }
}

/// First run date of a rule created on `created_on`.
///
/// A future start date is used as is; otherwise the schedule starts one
/// step after it, so a rule never fires for the day it was set up on.
#[must_use]
pub fn first_run_date(
    start_date: NaiveDate,
    created_on: NaiveDate,
    cadence: Cadence,
    options: &RuleOptions,
) -> Option<NaiveDate> {
    if start_date > created_on {
        Some(start_date)
    } else {
        advance_date(start_date, cadence, options)
    }
}

/// Calendar date of an instant as seen by a rule.
#[must_use]
pub fn local_date(at: DateTime<Utc>, cadence: Cadence, time_zone: Option<Tz>) -> NaiveDate {
    match zone(cadence, time_zone) {
        Some(tz) => at.with_timezone(&tz).date_naive(),
        None => at.date_naive(),
    }
}

/// Midnight of `date` as an absolute instant.
///
/// When midnight does not exist locally (a DST gap) the first instant of
/// the day is used.
#[must_use]
pub fn run_instant(date: NaiveDate, cadence: Cadence, time_zone: Option<Tz>) -> Option<DateTime<Utc>> {
    let midnight = date.and_time(NaiveTime::MIN);
    match zone(cadence, time_zone) {
        Some(tz) => {
            let local = tz
                .from_local_datetime(&midnight)
                .earliest()
                .or_else(|| tz.from_local_datetime(&(midnight + Duration::hours(1))).earliest())?;
            Some(local.with_timezone(&Utc))
        }
        None => Some(Utc.from_utc_datetime(&midnight)),
    }
}

/// The instant following `at` on the rule's schedule.
#[must_use]
pub fn advance(
    at: DateTime<Utc>,
    cadence: Cadence,
    options: &RuleOptions,
    time_zone: Option<Tz>,
) -> Option<DateTime<Utc>> {
    if cadence == Cadence::Daily {
        return at.checked_add_signed(Duration::days(1));
    }
    let next = advance_date(local_date(at, cadence, time_zone), cadence, options)?;
    run_instant(next, cadence, time_zone)
}

fn zone(cadence: Cadence, time_zone: Option<Tz>) -> Option<Tz> {
    if cadence == Cadence::Daily { None } else { time_zone }
}
