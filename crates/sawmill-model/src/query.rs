//! Query results, statistics, and aggregation types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{LogEntry, LogLevel};
use crate::error::{ModelError, Result};

/// A page of entries matching a filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQueryResult {
    /// Matching entries, descending by timestamp
    pub entries: Vec<LogEntry>,
    /// Total number of matching entries before pagination
    pub total_count: u64,
    /// Echoed page number
    pub page: u32,
    /// Echoed page size
    pub page_size: u32,
    /// Whether further pages exist
    pub has_more: bool,
}

impl LogQueryResult {
    /// Creates a result page, deriving `has_more` from the counts.
    #[must_use]
    pub fn new(entries: Vec<LogEntry>, total_count: u64, page: u32, page_size: u32) -> Self {
        let has_more = u64::from(page) * u64::from(page_size) < total_count;
        Self {
            entries,
            total_count,
            page,
            page_size,
            has_more,
        }
    }

    /// Creates an empty result page.
    #[must_use]
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }
}

/// Summary statistics over a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    /// Number of entries observed
    pub total_count: u64,
    /// Entry counts per severity level
    pub level_counts: BTreeMap<LogLevel, u64>,
    /// Entry counts per service name
    pub service_counts: BTreeMap<String, u64>,
    /// Timestamp of the oldest observed entry
    pub oldest: Option<DateTime<Utc>>,
    /// Timestamp of the newest observed entry
    pub newest: Option<DateTime<Utc>>,
}

impl LogStats {
    /// Folds one entry into the statistics.
    pub fn observe(&mut self, entry: &LogEntry) {
        self.total_count += 1;
        *self.level_counts.entry(entry.level).or_insert(0) += 1;
        *self
            .service_counts
            .entry(entry.service_name.clone())
            .or_insert(0) += 1;

        let ts = entry.recorded_at();
        if self.oldest.is_none_or(|oldest| ts < oldest) {
            self.oldest = Some(ts);
        }
        if self.newest.is_none_or(|newest| ts > newest) {
            self.newest = Some(ts);
        }
    }
}

/// Granularity for time-bucketed aggregation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum AggregateInterval {
    /// One bucket per minute
    Minute,
    /// One bucket per hour
    #[default]
    Hour,
    /// One bucket per day
    Day,
}

impl AggregateInterval {
    /// Returns the string representation of this interval.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Minute => "minute",
            Self::Hour => "hour",
            Self::Day => "day",
        }
    }

    /// Floors a timestamp to the start of its bucket.
    #[must_use]
    pub fn truncate(&self, ts: DateTime<Utc>) -> DateTime<Utc> {
        let truncated = match self {
            Self::Minute => ts.with_second(0).and_then(|t| t.with_nanosecond(0)),
            Self::Hour => ts
                .with_minute(0)
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0)),
            Self::Day => ts.date_naive().and_hms_opt(0, 0, 0).map(|t| t.and_utc()),
        };
        truncated.unwrap_or(ts)
    }
}

impl fmt::Display for AggregateInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregateInterval {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "minute" => Ok(Self::Minute),
            "hour" => Ok(Self::Hour),
            "day" => Ok(Self::Day),
            other => Err(ModelError::InvalidInterval(other.to_string())),
        }
    }
}

/// Entry count for one time bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateBucket {
    /// Start of the bucket
    pub bucket_start: DateTime<Utc>,
    /// Number of entries in the bucket
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantId;
    use chrono::TimeZone;
    use test_case::test_case;

    fn entry_at(service: &str, level: LogLevel, ts: DateTime<Utc>) -> LogEntry {
        let mut entry = LogEntry::builder()
            .tenant_id(TenantId::new())
            .service_name(service)
            .level(level)
            .message("event")
            .build()
            .expect("build entry");
        entry.timestamp = Some(ts);
        entry
    }

    // ===========================================
    // LogQueryResult Tests
    // ===========================================

    #[test]
    fn result_has_more_pages() {
        let result = LogQueryResult::new(Vec::new(), 250, 1, 100);
        assert!(result.has_more);

        let result = LogQueryResult::new(Vec::new(), 250, 3, 100);
        assert!(!result.has_more);

        let result = LogQueryResult::new(Vec::new(), 100, 1, 100);
        assert!(!result.has_more);
    }

    #[test]
    fn result_empty() {
        let result = LogQueryResult::empty(2, 50);
        assert!(result.entries.is_empty());
        assert_eq!(result.total_count, 0);
        assert_eq!(result.page, 2);
        assert!(!result.has_more);
    }

    // ===========================================
    // LogStats Tests
    // ===========================================

    #[test]
    fn stats_observe_accumulates() {
        let now = Utc::now();
        let mut stats = LogStats::default();
        stats.observe(&entry_at("api", LogLevel::Info, now));
        stats.observe(&entry_at("api", LogLevel::Error, now - chrono::Duration::hours(2)));
        stats.observe(&entry_at("billing", LogLevel::Error, now - chrono::Duration::hours(1)));

        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.level_counts.get(&LogLevel::Error), Some(&2));
        assert_eq!(stats.level_counts.get(&LogLevel::Info), Some(&1));
        assert_eq!(stats.service_counts.get("api"), Some(&2));
        assert_eq!(stats.oldest, Some(now - chrono::Duration::hours(2)));
        assert_eq!(stats.newest, Some(now));
    }

    #[test]
    fn stats_default_is_empty() {
        let stats = LogStats::default();
        assert_eq!(stats.total_count, 0);
        assert!(stats.level_counts.is_empty());
        assert!(stats.oldest.is_none());
    }

    // ===========================================
    // AggregateInterval Tests
    // ===========================================

    #[test_case("minute", AggregateInterval::Minute ; "minute")]
    #[test_case("HOUR", AggregateInterval::Hour ; "hour uppercase")]
    #[test_case("Day", AggregateInterval::Day ; "day mixed case")]
    fn interval_from_str(input: &str, expected: AggregateInterval) {
        assert_eq!(input.parse::<AggregateInterval>().expect("parse"), expected);
    }

    #[test]
    fn interval_from_str_rejects_unknown() {
        assert!("week".parse::<AggregateInterval>().is_err());
    }

    #[test]
    fn interval_default_is_hour() {
        assert_eq!(AggregateInterval::default(), AggregateInterval::Hour);
    }

    #[test]
    fn interval_truncate_boundaries() {
        let ts = Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 26).single().expect("timestamp");

        let minute = AggregateInterval::Minute.truncate(ts);
        assert_eq!(
            minute,
            Utc.with_ymd_and_hms(2025, 3, 14, 15, 9, 0).single().expect("timestamp")
        );

        let hour = AggregateInterval::Hour.truncate(ts);
        assert_eq!(
            hour,
            Utc.with_ymd_and_hms(2025, 3, 14, 15, 0, 0).single().expect("timestamp")
        );

        let day = AggregateInterval::Day.truncate(ts);
        assert_eq!(
            day,
            Utc.with_ymd_and_hms(2025, 3, 14, 0, 0, 0).single().expect("timestamp")
        );
    }

    #[test]
    fn interval_truncate_is_idempotent() {
        let ts = Utc::now();
        for interval in [
            AggregateInterval::Minute,
            AggregateInterval::Hour,
            AggregateInterval::Day,
        ] {
            let once = interval.truncate(ts);
            assert_eq!(interval.truncate(once), once);
        }
    }
}
