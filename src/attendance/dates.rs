use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::error::{AppError, AppResult};

pub const MIN_YEAR: i32 = 1970;
pub const MAX_YEAR: i32 = 2100;

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn day(day: NaiveDate) -> Self {
        Self { start: day, end: day }
    }

    #[cfg(test)]
    pub fn contains(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }
}

/// Current calendar day in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Parses a calendar day, stripping any time-of-day.
///
/// Accepts `YYYY-MM-DD`, RFC 3339 timestamps (the date is taken as written,
/// in the timestamp's own offset) and naive `YYYY-MM-DDTHH:MM:SS` values.
pub fn parse_day(raw: &str) -> AppResult<NaiveDate> {
    let raw = raw.trim();

    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(day);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts.date());
        }
    }

    Err(AppError::invalid(format!(
        "Invalid date '{raw}', expected YYYY-MM-DD"
    )))
}

/// `None` or blank means "today".
pub fn parse_day_or_today(raw: Option<&str>) -> AppResult<NaiveDate> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => parse_day(s),
        None => Ok(today()),
    }
}

pub fn validate_month_year(month: u32, year: i32) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(AppError::invalid("month must be between 1 and 12"));
    }
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(AppError::invalid(format!(
            "year must be between {MIN_YEAR} and {MAX_YEAR}"
        )));
    }
    Ok(())
}

/// First to last calendar day of `month`. The end is "day 0 of the next
/// month", i.e. the day before the next month's first day.
pub fn month_window(month: u32, year: i32) -> AppResult<DateWindow> {
    validate_month_year(month, year)?;

    let start = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::invalid("Invalid month/year"))?;
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let end = NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .ok_or_else(|| AppError::invalid("Invalid month/year"))?;

    Ok(DateWindow { start, end })
}

/// Both `month` and `year` must be present together.
pub fn optional_month_window(month: Option<u32>, year: Option<i32>) -> AppResult<Option<DateWindow>> {
    match (month, year) {
        (Some(m), Some(y)) => month_window(m, y).map(Some),
        (None, None) => Ok(None),
        _ => Err(AppError::invalid("month and year must be given together")),
    }
}
