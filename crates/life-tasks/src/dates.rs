//! Date range helpers for task configuration.
//!
//! `date_range: 7d` on a task exposes `{from_date}` and `{to_date}` to its
//! commands, as `YYYY-MM-DD` in local time.

use chrono::{Duration, Local, NaiveDate};

use crate::error::{Result, TaskError};
use life_jobs::Variables;

/// Parse `"7d"`, `"2w"` or `"1m"` into `(from_date, to_date)` ending today.
///
/// `w` is 7 days and `m` is 30 days. Units are case-insensitive.
pub fn parse_date_range(range: &str) -> Result<(String, String)> {
    parse_date_range_from(range, Local::now().date_naive())
}

fn parse_date_range_from(range: &str, today: NaiveDate) -> Result<(String, String)> {
    let from = range_days(range)
        .and_then(Duration::try_days)
        .and_then(|span| today.checked_sub_signed(span))
        .ok_or_else(|| TaskError::InvalidDateRange(range.to_string()))?;
    Ok((from.format("%Y-%m-%d").to_string(), today.format("%Y-%m-%d").to_string()))
}

fn range_days(range: &str) -> Option<i64> {
    let normalized = range.trim().to_lowercase();
    let unit = normalized.chars().last()?;
    let amount: i64 = normalized[..normalized.len() - unit.len_utf8()].parse().ok()?;
    if amount < 0 {
        return None;
    }
    match unit {
        'd' => Some(amount),
        'w' => amount.checked_mul(7),
        'm' => amount.checked_mul(30),
        _ => None,
    }
}

/// `{from_date, to_date}` variables for a range.
pub fn date_variables(range: &str) -> Result<Variables> {
    let (from_date, to_date) = parse_date_range(range)?;
    Ok(Variables::from([
        ("from_date".to_string(), from_date),
        ("to_date".to_string(), to_date),
    ]))
}
