use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};
use std::str::FromStr;

use crate::error::ApiError;

/// Due-date window accepted by `GET /api/bills?period=`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

impl FromStr for Period {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            other => Err(ApiError::bad_request(format!(
                "Invalid period '{}', expected week, month, quarter or year",
                other
            ))),
        }
    }
}

/// `status=paid|unpaid` as an `is_paid` filter
pub fn parse_status(raw: &str) -> Result<bool, ApiError> {
    match raw {
        "paid" => Ok(true),
        "unpaid" => Ok(false),
        other => Err(ApiError::bad_request(format!(
            "Invalid status '{}', expected paid or unpaid",
            other
        ))),
    }
}

fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(chrono::NaiveTime::MIN))
}

/// First day of the month `months` after (year, month)
fn month_start(year: i32, month: u32, months: u32) -> NaiveDate {
    let index = month - 1 + months;
    let (y, m) = (year + (index / 12) as i32, index % 12 + 1);
    NaiveDate::from_ymd_opt(y, m, 1).unwrap_or(NaiveDate::MAX)
}

/// Half-open UTC range `[start, end)` of the calendar period containing `now`.
/// Weeks start on Sunday.
pub fn period_range(period: Period, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let today = now.date_naive();
    let (start, end) = match period {
        Period::Week => {
            let start = today - Duration::days(i64::from(today.weekday().num_days_from_sunday()));
            (start, start + Duration::days(7))
        }
        Period::Month => (
            month_start(today.year(), today.month(), 0),
            month_start(today.year(), today.month(), 1),
        ),
        Period::Quarter => {
            let first = (today.month() - 1) / 3 * 3 + 1;
            (
                month_start(today.year(), first, 0),
                month_start(today.year(), first, 3),
            )
        }
        Period::Year => (
            month_start(today.year(), 1, 0),
            month_start(today.year(), 1, 12),
        ),
    };
    (midnight(start), midnight(end))
}

/// Resolved `(is_paid, paid_at)` for a PATCH, or `None` when the body does
/// not touch payment state. Keeps `is_paid` and `paid_at` consistent.
pub fn paid_transition(
    is_paid: Option<bool>,
    paid_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<Option<(bool, Option<DateTime<Utc>>)>, ApiError> {
    match (is_paid, paid_at) {
        (None, None) => Ok(None),
        (None, Some(_)) => Err(ApiError::field("paidAt", "paidAt can only be set together with isPaid")),
        (Some(false), Some(_)) => Err(ApiError::field("paidAt", "paidAt must be empty when isPaid is false")),
        (Some(false), None) => Ok(Some((false, None))),
        (Some(true), Some(at)) if at > now => Err(ApiError::field("paidAt", "paidAt cannot be in the future")),
        (Some(true), at) => Ok(Some((true, Some(at.unwrap_or(now))))),
    }
}
