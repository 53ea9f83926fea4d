//! Date formatting shared by both render backends.
//!
//! Dates render as `"{Mon} {YYYY}"`. The calendar date is taken exactly as written:
//! timestamps are truncated to their date component, never shifted through a timezone.

use chrono::NaiveDate;
use thiserror::Error;

/// Literal used for an open-ended range.
pub const PRESENT: &str = "Present";

#[derive(Debug, Clone, PartialEq, Error)]
#[error("unrecognised date '{0}'")]
pub struct DateError(pub String);

/// Parses `YYYY-MM-DD`, an RFC 3339 timestamp, or `YYYY-MM`.
pub fn parse_profile_date(raw: &str) -> Result<NaiveDate, DateError> {
    let trimmed = raw.trim();

    // Timestamps: the first ten bytes carry the calendar date.
    let date_part = match trimmed.split_once('T') {
        Some((date, _)) => date,
        None => trimmed,
    };

    if let Ok(date) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{date_part}-01"), "%Y-%m-%d") {
        return Ok(date);
    }
    Err(DateError(trimmed.to_string()))
}

/// Formats a present date as `"Jan 2023"`.
pub fn format_month_year(raw: &str) -> Result<String, DateError> {
    parse_profile_date(raw).map(|date| date.format("%b %Y").to_string())
}

/// Collects date problems while a plan is being built so a bad field never aborts a render.
#[derive(Debug, Default)]
pub struct DateFormatter {
    errors: Vec<DateError>,
}

impl DateFormatter {
    /// Formats a single optional date. Blank or missing → `None`; unparseable → raw text.
    pub fn single(&mut self, raw: Option<&str>) -> Option<String> {
        let raw = non_blank(raw)?;
        Some(self.format_or_raw(raw))
    }

    /// Formats an end date, where absence means the range is still open.
    pub fn end(&mut self, raw: Option<&str>) -> String {
        self.single(raw).unwrap_or_else(|| PRESENT.to_string())
    }

    /// Formats `start - end`. Both missing → `None`; start missing → the end alone.
    pub fn range(
        &mut self,
        start: Option<&str>,
        end: Option<&str>,
        is_current: bool,
    ) -> Option<String> {
        let start = self.single(start);
        let end_present = non_blank(end).is_some();

        match (start, end_present, is_current) {
            (None, false, false) => None,
            (None, _, true) => Some(PRESENT.to_string()),
            (None, true, false) => self.single(end),
            (Some(start), _, true) => Some(format!("{start} - {PRESENT}")),
            (Some(start), _, false) => Some(format!("{start} - {}", self.end(end))),
        }
    }

    /// Drains the problems recorded since the last call.
    pub fn take_errors(&mut self) -> Vec<DateError> {
        std::mem::take(&mut self.errors)
    }

    fn format_or_raw(&mut self, raw: &str) -> String {
        match format_month_year(raw) {
            Ok(formatted) => formatted,
            Err(err) => {
                self.errors.push(err);
                raw.trim().to_string()
            }
        }
    }
}

fn non_blank(raw: Option<&str>) -> Option<&str> {
    raw.filter(|s| !s.trim().is_empty())
}
