//! Query filters and time ranges.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::entry::{LogEntry, LogLevel};
use crate::tenant::TenantId;

/// Time range for filtering entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Start of the range (inclusive)
    pub start: Option<DateTime<Utc>>,
    /// End of the range (exclusive)
    pub end: Option<DateTime<Utc>>,
}

impl TimeRange {
    /// Creates a new time range with the given bounds.
    #[must_use]
    pub const fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// Creates a time range from a start time onwards.
    #[must_use]
    pub const fn since(start: DateTime<Utc>) -> Self {
        Self {
            start: Some(start),
            end: None,
        }
    }

    /// Creates a time range covering the last `hours` hours.
    #[must_use]
    pub fn last_hours(hours: i64) -> Self {
        Self::since(Utc::now() - Duration::hours(hours))
    }

    /// Creates a time range covering the last `days` days.
    #[must_use]
    pub fn last_days(days: i64) -> Self {
        Self::since(Utc::now() - Duration::days(days))
    }

    /// Checks if a timestamp falls within this range.
    #[must_use]
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if timestamp >= end {
                return false;
            }
        }
        true
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    LogFilter::DEFAULT_PAGE_SIZE
}

/// Filter criteria for querying entries.
///
/// All predicates are optional and combined as a conjunction; an unset
/// predicate matches everything. Two filters are equivalent for caching
/// purposes iff their JSON serializations are byte-identical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFilter {
    /// Filter by owning tenant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<TenantId>,
    /// Filter by exact service name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    /// Filter by exact severity level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<LogLevel>,
    /// Filter by minimum severity level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_level: Option<LogLevel>,
    /// Filter by time range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<TimeRange>,
    /// Filter by trace identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Filter by acting user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Filter by request identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Case-insensitive substring search in the message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_contains: Option<String>,
    /// Filter by deployment environment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    /// Page number, starting at 1
    #[serde(default = "default_page")]
    pub page: u32,
    /// Entries per page, valid range [1, 1000]
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            tenant_id: None,
            service_name: None,
            level: None,
            min_level: None,
            time_range: None,
            trace_id: None,
            user_id: None,
            request_id: None,
            message_contains: None,
            environment: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl LogFilter {
    /// Page size applied when the requested size is out of range.
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    /// Largest accepted page size.
    pub const MAX_PAGE_SIZE: u32 = 1000;

    /// Creates a new empty filter that matches all entries.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tenant filter.
    #[must_use]
    pub const fn with_tenant(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Adds an exact service name filter.
    #[must_use]
    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Adds an exact level filter.
    #[must_use]
    pub const fn with_level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Adds a minimum level filter.
    #[must_use]
    pub const fn with_min_level(mut self, min_level: LogLevel) -> Self {
        self.min_level = Some(min_level);
        self
    }

    /// Adds a time range filter.
    #[must_use]
    pub const fn with_time_range(mut self, time_range: TimeRange) -> Self {
        self.time_range = Some(time_range);
        self
    }

    /// Adds a trace identifier filter.
    #[must_use]
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Adds a user identifier filter.
    #[must_use]
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Adds a request identifier filter.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Adds a message substring filter.
    #[must_use]
    pub fn with_contains(mut self, text: impl Into<String>) -> Self {
        self.message_contains = Some(text.into());
        self
    }

    /// Adds an environment filter.
    #[must_use]
    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Sets the page number.
    #[must_use]
    pub const fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }

    /// Sets the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Returns the page number with the lower bound applied.
    #[must_use]
    pub const fn normalized_page(&self) -> u32 {
        if self.page == 0 { 1 } else { self.page }
    }

    /// Returns the page size, substituting the default for out-of-range
    /// values.
    #[must_use]
    pub const fn normalized_page_size(&self) -> u32 {
        if self.page_size == 0 || self.page_size > Self::MAX_PAGE_SIZE {
            Self::DEFAULT_PAGE_SIZE
        } else {
            self.page_size
        }
    }

    /// Checks if an entry matches every predicate of this filter.
    ///
    /// Pagination fields are ignored here.
    #[must_use]
    pub fn matches(&self, entry: &LogEntry) -> bool {
        if let Some(tenant_id) = self.tenant_id {
            if entry.tenant_id != tenant_id {
                return false;
            }
        }

        if let Some(ref service_name) = self.service_name {
            if entry.service_name != *service_name {
                return false;
            }
        }

        if let Some(level) = self.level {
            if entry.level != level {
                return false;
            }
        }

        if let Some(min_level) = self.min_level {
            if !entry.level.is_at_least(min_level) {
                return false;
            }
        }

        if let Some(ref time_range) = self.time_range {
            if !time_range.contains(entry.recorded_at()) {
                return false;
            }
        }

        if let Some(ref trace_id) = self.trace_id {
            if entry.trace_id.as_ref() != Some(trace_id) {
                return false;
            }
        }

        if let Some(ref user_id) = self.user_id {
            if entry.user_id.as_ref() != Some(user_id) {
                return false;
            }
        }

        if let Some(ref request_id) = self.request_id {
            if entry.request_id.as_ref() != Some(request_id) {
                return false;
            }
        }

        if let Some(ref text) = self.message_contains {
            let needle = text.to_lowercase();
            if !entry.message.to_lowercase().contains(&needle) {
                return false;
            }
        }

        if let Some(ref environment) = self.environment {
            if entry.environment.as_ref() != Some(environment) {
                return false;
            }
        }

        true
    }
}
