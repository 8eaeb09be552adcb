//! Epoch handling and time windows.
//!
//! All epochs are `i64` nanoseconds since 1970-01-01T00:00:00Z. Bounds given as
//! ISO-8601 strings are parsed with `chrono`; strings without an offset are
//! taken as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{ProcessingError, Result};

/// Inclusive time window. An absent bound is unbounded on that side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<i64>,
    pub end: Option<i64>,
}

impl TimeWindow {
    /// A window with no bounds.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Build a window from nanosecond epochs.
    pub fn new(start: Option<i64>, end: Option<i64>) -> Result<Self> {
        if let (Some(s), Some(e)) = (start, end) {
            if s > e {
                return Err(ProcessingError::InvalidTime {
                    value: format!("{s}..{e}"),
                    reason: "window start is after window end".to_string(),
                });
            }
        }
        Ok(Self { start, end })
    }

    /// Build a window from optional ISO-8601 strings.
    ///
    /// ```
    /// use mms_fields::TimeWindow;
    /// let w = TimeWindow::from_iso(Some("2015-10-16T13:00:00Z"), None).unwrap();
    /// assert!(w.end.is_none());
    /// ```
    pub fn from_iso(start: Option<&str>, end: Option<&str>) -> Result<Self> {
        let start = start.map(parse_iso).transpose()?;
        let end = end.map(parse_iso).transpose()?;
        Self::new(start, end)
    }

    /// Whether `t` lies inside the window.
    pub fn contains(&self, t: i64) -> bool {
        self.start.map_or(true, |s| t >= s) && self.end.map_or(true, |e| t <= e)
    }

    /// Whether the closed interval `[a, b]` intersects the window.
    pub fn intersects(&self, a: i64, b: i64) -> bool {
        self.start.map_or(true, |s| b >= s) && self.end.map_or(true, |e| a <= e)
    }

    /// Index range of a sorted epoch slice that lies inside the window.
    pub fn index_range(&self, epoch: &[i64]) -> std::ops::Range<usize> {
        let lo = self.start.map_or(0, |s| epoch.partition_point(|&t| t < s));
        let hi = self
            .end
            .map_or(epoch.len(), |e| epoch.partition_point(|&t| t <= e));
        lo..hi.max(lo)
    }
}

/// Parse an ISO-8601 timestamp into nanoseconds since the Unix epoch.
pub fn parse_iso(value: &str) -> Result<i64> {
    let utc = match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => dt.with_timezone(&Utc),
        Err(_) => NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(|e| ProcessingError::InvalidTime {
                value: value.to_string(),
                reason: e.to_string(),
            })?,
    };
    utc.timestamp_nanos_opt()
        .ok_or_else(|| ProcessingError::InvalidTime {
            value: value.to_string(),
            reason: "outside the representable nanosecond range".to_string(),
        })
}

/// Index of the last element of `sorted` that is `<= t`, if any.
pub(crate) fn last_at_or_before(sorted: &[i64], t: i64) -> Option<usize> {
    sorted.partition_point(|&x| x <= t).checked_sub(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_iso_forms() {
        let a = parse_iso("1970-01-01T00:00:01Z").unwrap();
        assert_eq!(a, 1_000_000_000);
        let b = parse_iso("1970-01-01T00:00:01.5").unwrap();
        assert_eq!(b, 1_500_000_000);
        let c = parse_iso("1970-01-01T01:00:00+01:00").unwrap();
        assert_eq!(c, 0);
    }

    #[test]
    fn test_parse_iso_rejects_garbage() {
        assert!(matches!(
            parse_iso("yesterday"),
            Err(ProcessingError::InvalidTime { .. })
        ));
    }

    #[test]
    fn test_reversed_window_rejected() {
        assert!(TimeWindow::new(Some(10), Some(5)).is_err());
        assert!(TimeWindow::new(Some(5), Some(5)).is_ok());
    }

    #[test]
    fn test_index_range() {
        let epoch = [0, 10, 20, 30, 40];
        let w = TimeWindow::new(Some(10), Some(30)).unwrap();
        assert_eq!(w.index_range(&epoch), 1..4);
        assert_eq!(TimeWindow::unbounded().index_range(&epoch), 0..5);
        let empty = TimeWindow::new(Some(41), None).unwrap();
        assert!(empty.index_range(&epoch).is_empty());
    }

    #[test]
    fn test_last_at_or_before() {
        let s = [10, 20, 30];
        assert_eq!(last_at_or_before(&s, 5), None);
        assert_eq!(last_at_or_before(&s, 10), Some(0));
        assert_eq!(last_at_or_before(&s, 25), Some(1));
        assert_eq!(last_at_or_before(&s, 99), Some(2));
    }
}
