// LogDepot - core/filter.rs
//
// Explicit, enumerated filters for registry lookups and log queries.
// All active filters are AND-combined. Empty parameter strings count as
// "not supplied", matching how query strings arrive from clients.
// Core layer: pure logic, no I/O.

use crate::core::model::StoredFile;
use crate::util::constants;
use crate::util::error::{QueryError, RegistryError};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Treat `None` and `Some("")` alike.
fn supplied(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, constants::QUERY_DATE_FORMAT).ok()
}

// =============================================================================
// Source-file filter
// =============================================================================

/// Registry lookup filter: one optional field per supported predicate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileFilter {
    /// Case-insensitive substring of the stored filename.
    pub name: Option<String>,

    /// Case-insensitive substring of the file type (extension).
    pub file_type: Option<String>,

    /// Calendar date (UTC) on which the file was ingested.
    pub ingested_on: Option<NaiveDate>,
}

impl FileFilter {
    /// Build a filter from raw request parameters.
    ///
    /// Returns `RegistryError::InvalidFilter` when `date` is supplied but is
    /// not a `YYYY-MM-DD` calendar date.
    pub fn from_params(
        filename: Option<&str>,
        file_type: Option<&str>,
        date: Option<&str>,
    ) -> Result<Self, RegistryError> {
        let ingested_on = match supplied(date) {
            Some(raw) => Some(parse_date(raw).ok_or_else(|| RegistryError::InvalidFilter {
                field: "date",
                value: raw.to_string(),
                expected: "YYYY-MM-DD",
            })?),
            None => None,
        };
        Ok(Self {
            name: supplied(filename).map(str::to_lowercase),
            file_type: supplied(file_type).map(str::to_lowercase),
            ingested_on,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.file_type.is_none() && self.ingested_on.is_none()
    }

    /// True when `file` satisfies every supplied predicate.
    ///
    /// Substring fields are stored lowercased by `from_params`; filters built
    /// by hand are lowercased here too.
    pub fn matches(&self, file: &StoredFile) -> bool {
        if let Some(ref needle) = self.name {
            if !file.name.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(ref needle) = self.file_type {
            if !file.file_type.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if let Some(day) = self.ingested_on {
            if file.ingested_at.date_naive() != day {
                return false;
            }
        }
        true
    }
}

// =============================================================================
// Keyword
// =============================================================================

/// Case-insensitive substring needle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    lowered: String,
}

impl Keyword {
    /// Returns `None` for an empty keyword (an empty keyword is no keyword).
    pub fn new(raw: &str) -> Option<Self> {
        if raw.is_empty() {
            return None;
        }
        Some(Self {
            lowered: raw.to_lowercase(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.lowered
    }

    pub fn occurs_in(&self, haystack: &str) -> bool {
        haystack.to_lowercase().contains(&self.lowered)
    }
}

// =============================================================================
// Time window
// =============================================================================

/// Inclusive `[start, end]` window. `start > end` is accepted and simply
/// matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window between midnight (UTC) of `start` and midnight (UTC) of `end`.
    pub fn from_dates(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.and_time(NaiveTime::MIN).and_utc(),
            end: end.and_time(NaiveTime::MIN).and_utc(),
        }
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

// =============================================================================
// Log query
// =============================================================================

/// Raw log query parameters as received from a client.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct LogQueryParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub keyword: Option<String>,
    pub filename: Option<String>,
    pub file_type: Option<String>,
    pub date: Option<String>,
}

/// A validated log query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Only built when both bounds were supplied.
    pub window: Option<TimeWindow>,
    pub keyword: Option<Keyword>,
    pub files: FileFilter,
}

impl LogQuery {
    /// Validate raw parameters.
    ///
    /// A window is only built when both dates are supplied; a lone bound is
    /// ignored without being parsed. An unparseable bound aborts the query.
    pub fn from_params(params: &LogQueryParams) -> Result<Self, QueryError> {
        let start = supplied(params.start_date.as_deref());
        let end = supplied(params.end_date.as_deref());

        let window = match (start, end) {
            (Some(start_raw), Some(end_raw)) => {
                let start = parse_query_date("start_date", start_raw)?;
                let end = parse_query_date("end_date", end_raw)?;
                Some(TimeWindow::from_dates(start, end))
            }
            _ => None,
        };

        let files = FileFilter::from_params(
            params.filename.as_deref(),
            params.file_type.as_deref(),
            params.date.as_deref(),
        )?;

        Ok(Self {
            window,
            keyword: params.keyword.as_deref().and_then(Keyword::new),
            files,
        })
    }

    /// Decide whether a structured line is part of the result.
    pub fn accepts_structured(&self, ts: DateTime<Utc>, message: &str) -> bool {
        if let Some(window) = self.window {
            if !window.contains(ts) {
                return false;
            }
        }
        match self.keyword {
            Some(ref keyword) => keyword.occurs_in(message),
            None => true,
        }
    }
}

fn parse_query_date(field: &'static str, raw: &str) -> Result<NaiveDate, QueryError> {
    parse_date(raw).ok_or_else(|| QueryError::InvalidDate {
        field,
        value: raw.to_string(),
        expected: "YYYY-MM-DD",
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn stored(name: &str, file_type: &str, at: DateTime<Utc>) -> StoredFile {
        StoredFile {
            id: 1,
            name: name.to_string(),
            path: PathBuf::from(name),
            file_type: file_type.to_string(),
            ingested_at: at,
        }
    }

    fn params(start: Option<&str>, end: Option<&str>, keyword: Option<&str>) -> LogQueryParams {
        LogQueryParams {
            start_date: start.map(String::from),
            end_date: end.map(String::from),
            keyword: keyword.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_file_filter_matches_everything() {
        let filter = FileFilter::from_params(Some(""), None, Some("")).unwrap();
        assert!(filter.is_empty());
        let file = stored("a.txt", "txt", Utc::now());
        assert!(filter.matches(&file));
    }

    #[test]
    fn test_name_filter_case_insensitive_substring() {
        let filter = FileFilter::from_params(Some("SERVER"), None, None).unwrap();
        assert!(filter.matches(&stored("web_server.txt", "txt", Utc::now())));
        assert!(!filter.matches(&stored("client.txt", "txt", Utc::now())));
    }

    #[test]
    fn test_filters_are_and_combined() {
        let at = Utc.with_ymd_and_hms(2024, 3, 16, 23, 59, 59).unwrap();
        let filter = FileFilter::from_params(Some("app"), Some("ZIP"), Some("2024-03-16")).unwrap();
        assert!(filter.matches(&stored("app.zip", "zip", at)));
        assert!(!filter.matches(&stored("app.txt", "txt", at)));
        let next_day = Utc.with_ymd_and_hms(2024, 3, 17, 0, 0, 0).unwrap();
        assert!(!filter.matches(&stored("app.zip", "zip", next_day)));
    }

    #[test]
    fn test_invalid_filter_date_is_rejected() {
        let err = FileFilter::from_params(None, None, Some("not-a-date")).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFilter { field: "date", .. }));
    }

    #[test]
    fn test_window_requires_both_bounds() {
        let q = LogQuery::from_params(&params(Some("2024-03-15"), None, None)).unwrap();
        assert!(q.window.is_none());
        // A lone malformed bound is never parsed.
        let q = LogQuery::from_params(&params(None, Some("garbage"), None)).unwrap();
        assert!(q.window.is_none());
    }

    #[test]
    fn test_malformed_window_bound_aborts() {
        let err = LogQuery::from_params(&params(Some("2024-03-15"), Some("03/18/2024"), None))
            .unwrap_err();
        assert!(matches!(err, QueryError::InvalidDate { field: "end_date", .. }));
    }

    #[test]
    fn test_window_bounds_are_midnight_inclusive() {
        let q = LogQuery::from_params(&params(Some("2024-03-15"), Some("2024-03-18"), None))
            .unwrap();
        let inside = Utc.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap();
        let before = Utc.with_ymd_and_hms(2024, 3, 11, 10, 0, 0).unwrap();
        let end_exact = Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 0).unwrap();
        let end_later = Utc.with_ymd_and_hms(2024, 3, 18, 0, 0, 1).unwrap();
        assert!(q.accepts_structured(inside, "boot ok"));
        assert!(!q.accepts_structured(before, "boot ok"));
        assert!(q.accepts_structured(end_exact, "x"));
        assert!(!q.accepts_structured(end_later, "x"));
    }

    #[test]
    fn test_inverted_window_matches_nothing() {
        let q = LogQuery::from_params(&params(Some("2024-03-18"), Some("2024-03-15"), None))
            .unwrap();
        let ts = Utc.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap();
        assert!(!q.accepts_structured(ts, "boot ok"));
    }

    #[test]
    fn test_keyword_is_case_insensitive_and_empty_means_none() {
        assert!(Keyword::new("").is_none());
        let kw = Keyword::new("WrOnG").unwrap();
        assert!(kw.occurs_in("Something went WRONG here"));
        assert!(!kw.occurs_in("all good"));
    }

    #[test]
    fn test_query_file_filter_errors_propagate() {
        let mut p = params(None, None, None);
        p.date = Some("2024-99-99".to_string());
        let err = LogQuery::from_params(&p).unwrap_err();
        assert!(matches!(err, QueryError::Filter(_)));
    }
}
