//! Log entries and severity levels.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};
use crate::tenant::TenantId;

/// Log severity levels, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Detailed debugging information
    Debug = 0,
    /// General information
    Info = 1,
    /// Warning conditions
    Warn = 2,
    /// Error conditions
    Error = 3,
    /// Unrecoverable failures
    Fatal = 4,
}

impl LogLevel {
    /// Returns true if this level is at least as severe as the given level.
    #[must_use]
    pub fn is_at_least(&self, level: Self) -> bool {
        *self >= level
    }

    /// Returns the string representation of this level.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "fatal" => Ok(Self::Fatal),
            other => Err(ModelError::InvalidLevel(other.to_string())),
        }
    }
}

/// A structured log entry.
///
/// `id` and `timestamp` are assigned at ingestion when absent; both are
/// immutable once set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique identifier, assigned at ingestion if absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Name of the service that emitted the entry
    pub service_name: String,
    /// Severity level
    pub level: LogLevel,
    /// The log message
    pub message: String,
    /// When the event occurred, assigned at ingestion if absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Distributed trace identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    /// Span identifier within the trace
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    /// Acting user identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Request identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    /// Opaque structured payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Emitting component within the service
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Host the entry originated from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Deployment environment (production, staging, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl LogEntry {
    /// Creates a new log entry builder.
    #[must_use]
    pub fn builder() -> LogEntryBuilder {
        LogEntryBuilder::default()
    }

    /// Returns the timestamp, or the Unix epoch for entries that have not
    /// been through ingestion yet.
    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Validates the entry's required fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the service name or message is empty.
    pub fn validate(&self) -> Result<()> {
        if self.service_name.is_empty() {
            return Err(ModelError::InvalidEntry {
                reason: "service name cannot be empty".to_string(),
            });
        }
        if self.message.is_empty() {
            return Err(ModelError::InvalidEntry {
                reason: "message cannot be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Builder for constructing log entries.
#[derive(Debug, Default)]
pub struct LogEntryBuilder {
    id: Option<Uuid>,
    tenant_id: Option<TenantId>,
    service_name: Option<String>,
    level: Option<LogLevel>,
    message: Option<String>,
    timestamp: Option<DateTime<Utc>>,
    trace_id: Option<String>,
    span_id: Option<String>,
    user_id: Option<String>,
    request_id: Option<String>,
    metadata: Option<serde_json::Value>,
    source: Option<String>,
    host: Option<String>,
    environment: Option<String>,
}

impl LogEntryBuilder {
    /// Sets an explicit entry identifier.
    #[must_use]
    pub const fn id(mut self, id: Uuid) -> Self {
        self.id = Some(id);
        self
    }

    /// Sets the owning tenant.
    #[must_use]
    pub const fn tenant_id(mut self, tenant_id: TenantId) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    /// Sets the emitting service name.
    #[must_use]
    pub fn service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    /// Sets the severity level. Defaults to [`LogLevel::Info`].
    #[must_use]
    pub const fn level(mut self, level: LogLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Sets the message.
    #[must_use]
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Sets an explicit timestamp.
    #[must_use]
    pub const fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the trace identifier.
    #[must_use]
    pub fn trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Sets the span identifier.
    #[must_use]
    pub fn span_id(mut self, span_id: impl Into<String>) -> Self {
        self.span_id = Some(span_id.into());
        self
    }

    /// Sets the acting user identifier.
    #[must_use]
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Sets the request identifier.
    #[must_use]
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the structured payload.
    #[must_use]
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the emitting component.
    #[must_use]
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the originating host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the deployment environment.
    #[must_use]
    pub fn environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Builds the log entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the tenant, service name, or message is missing,
    /// or if a provided field fails validation.
    pub fn build(self) -> Result<LogEntry> {
        let tenant_id = self.tenant_id.ok_or(ModelError::MissingField("tenant_id"))?;
        let service_name = self
            .service_name
            .ok_or(ModelError::MissingField("service_name"))?;
        let message = self.message.ok_or(ModelError::MissingField("message"))?;

        let entry = LogEntry {
            id: self.id,
            tenant_id,
            service_name,
            level: self.level.unwrap_or(LogLevel::Info),
            message,
            timestamp: self.timestamp,
            trace_id: self.trace_id,
            span_id: self.span_id,
            user_id: self.user_id,
            request_id: self.request_id,
            metadata: self.metadata,
            source: self.source,
            host: self.host,
            environment: self.environment,
        };
        entry.validate()?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    // ===========================================
    // LogLevel Tests
    // ===========================================

    #[test]
    fn log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Fatal);
    }

    #[test]
    fn log_level_is_at_least() {
        assert!(LogLevel::Fatal.is_at_least(LogLevel::Debug));
        assert!(LogLevel::Error.is_at_least(LogLevel::Error));
        assert!(!LogLevel::Info.is_at_least(LogLevel::Warn));
    }

    #[test_case("debug", LogLevel::Debug ; "debug lowercase")]
    #[test_case("INFO", LogLevel::Info ; "info uppercase")]
    #[test_case("Warn", LogLevel::Warn ; "warn mixed case")]
    #[test_case("error", LogLevel::Error ; "error lowercase")]
    #[test_case("FATAL", LogLevel::Fatal ; "fatal uppercase")]
    fn log_level_from_str(input: &str, expected: LogLevel) {
        assert_eq!(input.parse::<LogLevel>().expect("parse"), expected);
    }

    #[test]
    fn log_level_from_str_rejects_unknown() {
        let err = "verbose".parse::<LogLevel>();
        assert!(err.is_err());
    }

    #[test]
    fn log_level_serialization() {
        let json = serde_json::to_string(&LogLevel::Fatal).expect("serialize");
        assert_eq!(json, "\"fatal\"");

        let level: LogLevel = serde_json::from_str("\"warn\"").expect("deserialize");
        assert_eq!(level, LogLevel::Warn);
    }

    #[test]
    fn log_level_display_matches_as_str() {
        for level in [
            LogLevel::Debug,
            LogLevel::Info,
            LogLevel::Warn,
            LogLevel::Error,
            LogLevel::Fatal,
        ] {
            assert_eq!(level.to_string(), level.as_str());
        }
    }

    // ===========================================
    // LogEntry Tests
    // ===========================================

    fn make_test_entry() -> LogEntry {
        LogEntry::builder()
            .tenant_id(TenantId::new())
            .service_name("api-gateway")
            .level(LogLevel::Info)
            .message("request completed")
            .build()
            .expect("build entry")
    }

    #[test]
    fn entry_builder_success() {
        let tenant = TenantId::new();
        let now = Utc::now();

        let entry = LogEntry::builder()
            .tenant_id(tenant)
            .service_name("billing")
            .level(LogLevel::Error)
            .message("charge failed")
            .timestamp(now)
            .trace_id("trace-1")
            .request_id("req-9")
            .metadata(serde_json::json!({"amount": 42}))
            .environment("production")
            .build()
            .expect("build entry");

        assert_eq!(entry.tenant_id, tenant);
        assert_eq!(entry.service_name, "billing");
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.timestamp, Some(now));
        assert_eq!(entry.trace_id.as_deref(), Some("trace-1"));
        assert!(entry.id.is_none());
    }

    #[test]
    fn entry_builder_defaults_level_to_info() {
        let entry = LogEntry::builder()
            .tenant_id(TenantId::new())
            .service_name("worker")
            .message("started")
            .build()
            .expect("build entry");

        assert_eq!(entry.level, LogLevel::Info);
    }

    #[test]
    fn entry_builder_missing_tenant() {
        let result = LogEntry::builder()
            .service_name("worker")
            .message("started")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn entry_builder_rejects_empty_service() {
        let result = LogEntry::builder()
            .tenant_id(TenantId::new())
            .service_name("")
            .message("started")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn entry_validate_rejects_empty_message() {
        let mut entry = make_test_entry();
        entry.message = String::new();
        assert!(entry.validate().is_err());
    }

    #[test]
    fn entry_recorded_at_defaults_to_epoch() {
        let mut entry = make_test_entry();
        entry.timestamp = None;
        assert_eq!(entry.recorded_at(), DateTime::UNIX_EPOCH);

        let now = Utc::now();
        entry.timestamp = Some(now);
        assert_eq!(entry.recorded_at(), now);
    }

    #[test]
    fn entry_serialization_roundtrip() {
        let mut entry = make_test_entry();
        entry.id = Some(Uuid::new_v4());
        entry.timestamp = Some(Utc::now());

        let json = serde_json::to_string(&entry).expect("serialize");
        let back: LogEntry = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(entry, back);
    }

    #[test]
    fn entry_deserializes_without_optional_fields() {
        let tenant = TenantId::new();
        let json = format!(
            r#"{{"tenant_id":"{tenant}","service_name":"api","level":"warn","message":"slow"}}"#
        );
        let entry: LogEntry = serde_json::from_str(&json).expect("deserialize");
        assert!(entry.id.is_none());
        assert!(entry.timestamp.is_none());
        assert_eq!(entry.level, LogLevel::Warn);
    }
}
