//! Date converters.
//!
//! Dates use ISO 8601 ordering with optional zero padding on the way in and
//! canonical padding on the way out, so `1958-3-25` parses and renders as
//! `1958-03-25`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Weekday};
use pathconv_core::{PathconvError, PathconvResult};

use super::combined::Combined;
use super::{unexpected, ConverterInfo, PathConverter, PathValue, ValueKind};

/// Regex for `YYYY-M-D` with optional zero padding.
pub const DATE_REGEX: &str = "[0-9]{4}-(?:0?[1-9]|1[0-2])-(?:0?[1-9]|[12][0-9]|3[01])";

/// Regex for `YYYY-M` with optional zero padding.
pub const MONTH_REGEX: &str = "[0-9]{4}-(?:0?[1-9]|1[0-2])";

/// Regex for an ISO week, `YYYY-Www`.
pub const WEEK_REGEX: &str = "[0-9]{4}-W(?:0?[1-9]|[1-4][0-9]|5[0-3])";

fn invalid(kind: &str, fragment: &str) -> PathconvError {
    PathconvError::BadRequest(format!("Invalid {kind}: {fragment}"))
}

fn parse_parts(fragment: &str, count: usize) -> Option<Vec<u32>> {
    let parts = fragment
        .split('-')
        .map(str::parse::<u32>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    (parts.len() == count).then_some(parts)
}

/// Converter for calendar dates.
#[derive(Debug, Clone)]
pub struct DateConverter {
    info: ConverterInfo,
}

impl Default for DateConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("date", DATE_REGEX)
                .examples(["2023-01-21", "1958-3-25"])
                .accepts(ValueKind::Date),
        }
    }
}

#[async_trait]
impl PathConverter for DateConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let parts = parse_parts(fragment, 3).ok_or_else(|| invalid("date", fragment))?;
        let year = i32::try_from(parts[0]).map_err(|_| invalid("date", fragment))?;
        NaiveDate::from_ymd_opt(year, parts[1], parts[2])
            .map(PathValue::Date)
            .ok_or_else(|| invalid("date", fragment))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Date(d) => Ok(d.format("%Y-%m-%d").to_string()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for months. Parses to the first day of the month.
#[derive(Debug, Clone)]
pub struct MonthConverter {
    info: ConverterInfo,
}

impl Default for MonthConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("month", MONTH_REGEX)
                .examples(["2023-01", "1958-3"])
                .accepts(ValueKind::Date),
        }
    }
}

#[async_trait]
impl PathConverter for MonthConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let parts = parse_parts(fragment, 2).ok_or_else(|| invalid("month", fragment))?;
        let year = i32::try_from(parts[0]).map_err(|_| invalid("month", fragment))?;
        NaiveDate::from_ymd_opt(year, parts[1], 1)
            .map(PathValue::Date)
            .ok_or_else(|| invalid("month", fragment))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Date(d) => Ok(d.format("%Y-%m").to_string()),
            other => Err(unexpected(self, other)),
        }
    }
}

/// Converter for ISO weeks. Parses to the Monday of the week.
///
/// Week 53 only exists in long ISO years; other years reject it.
#[derive(Debug, Clone)]
pub struct WeekConverter {
    info: ConverterInfo,
}

impl Default for WeekConverter {
    fn default() -> Self {
        Self {
            info: ConverterInfo::new("week", WEEK_REGEX)
                .examples(["2023-W03", "2020-W53", "1958-W1"])
                .accepts(ValueKind::Date),
        }
    }
}

#[async_trait]
impl PathConverter for WeekConverter {
    fn info(&self) -> &ConverterInfo {
        &self.info
    }

    async fn to_value(&self, fragment: &str) -> PathconvResult<PathValue> {
        let (year, week) = fragment
            .split_once("-W")
            .ok_or_else(|| invalid("week", fragment))?;
        let year: i32 = year.parse().map_err(|_| invalid("week", fragment))?;
        let week: u32 = week.parse().map_err(|_| invalid("week", fragment))?;
        NaiveDate::from_isoywd_opt(year, week, Weekday::Mon)
            .map(PathValue::Date)
            .ok_or_else(|| invalid("week", fragment))
    }

    fn render(&self, value: &PathValue) -> PathconvResult<String> {
        match value {
            PathValue::Date(d) => {
                let week = d.iso_week();
                Ok(format!("{:04}-W{:02}", week.year(), week.week()))
            }
            other => Err(unexpected(self, other)),
        }
    }
}

/// Builds the `daterange` converter: two dates joined by `/`, parsed into a
/// tuple of `start` and `end`.
///
/// # Errors
///
/// Propagates [`Combined::new`] failures.
pub fn date_range() -> PathconvResult<Combined> {
    let start: Arc<dyn PathConverter> = Arc::new(DateConverter::default());
    let end: Arc<dyn PathConverter> = Arc::new(DateConverter::default());
    Ok(
        Combined::new("daterange", "/", vec![("start", start), ("end", end)])?
            .with_examples(["1958-3-25/2019-11-25", "2023-01-01/2023-01-31"]),
    )
}
