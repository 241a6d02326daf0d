//! Alert rules evaluated against newly ingested entries.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ModelError, Result};
use crate::filter::LogFilter;
use crate::tenant::TenantId;

/// Urgency attached to a rule's notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    /// Informational alert, no action required.
    Info,
    /// Warning alert, should be investigated.
    #[default]
    Warning,
    /// Critical alert, requires immediate attention.
    Critical,
}

impl AlertSeverity {
    /// Returns the severity as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A filter plus trigger policy evaluated against new entries.
///
/// Evaluation considers only the service name, exact level, and tenant of
/// the rule's filter; the remaining filter fields are carried for
/// compatibility. `threshold` and `window_mins` are likewise persisted but
/// not consulted by per-entry evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertRule {
    /// Unique identifier for this rule
    pub id: Uuid,
    /// Owning tenant
    pub tenant_id: TenantId,
    /// Human-readable rule name
    pub name: String,
    /// What the rule watches for
    #[serde(default)]
    pub description: String,
    /// Whether the rule participates in evaluation
    pub enabled: bool,
    /// Match predicate applied to incoming entries
    pub filter: LogFilter,
    /// Notification urgency
    pub severity: AlertSeverity,
    /// Declared trigger threshold (not consulted by per-entry evaluation)
    pub threshold: u32,
    /// Declared aggregation window in minutes (not consulted by per-entry
    /// evaluation)
    pub window_mins: u32,
    /// Notification channel names (delivery handled elsewhere)
    #[serde(default)]
    pub channels: Vec<String>,
    /// When the rule last fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_triggered: Option<DateTime<Utc>>,
    /// When the rule was created
    pub created_at: DateTime<Utc>,
    /// When the rule was last modified
    pub updated_at: DateTime<Utc>,
}

impl AlertRule {
    /// Maximum length of a rule name.
    pub const MAX_NAME_LENGTH: usize = 256;

    /// Default aggregation window in minutes.
    pub const DEFAULT_WINDOW_MINS: u32 = 5;

    /// Creates a new alert rule builder.
    pub fn builder(name: impl Into<String>, tenant_id: TenantId) -> AlertRuleBuilder {
        AlertRuleBuilder::new(name, tenant_id)
    }

    /// Returns true if the rule fired within the last `cooldown`.
    #[must_use]
    pub fn in_cooldown(&self, now: DateTime<Utc>, cooldown: Duration) -> bool {
        self.last_triggered
            .is_some_and(|last| now.signed_duration_since(last) < cooldown)
    }
}

/// Builder for creating [`AlertRule`] instances.
#[derive(Debug)]
pub struct AlertRuleBuilder {
    name: String,
    tenant_id: TenantId,
    description: String,
    enabled: bool,
    filter: LogFilter,
    severity: AlertSeverity,
    threshold: u32,
    window_mins: u32,
    channels: Vec<String>,
}

impl AlertRuleBuilder {
    /// Creates a new builder with required fields.
    fn new(name: impl Into<String>, tenant_id: TenantId) -> Self {
        Self {
            name: name.into(),
            tenant_id,
            description: String::new(),
            enabled: true,
            filter: LogFilter::new(),
            severity: AlertSeverity::Warning,
            threshold: 1,
            window_mins: AlertRule::DEFAULT_WINDOW_MINS,
            channels: Vec::new(),
        }
    }

    /// Sets the rule description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets whether the rule starts enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the match predicate.
    #[must_use]
    pub fn filter(mut self, filter: LogFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the notification severity.
    #[must_use]
    pub const fn severity(mut self, severity: AlertSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the declared trigger threshold.
    #[must_use]
    pub const fn threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sets the declared aggregation window.
    #[must_use]
    pub const fn window_mins(mut self, window_mins: u32) -> Self {
        self.window_mins = window_mins;
        self
    }

    /// Adds a notification channel.
    #[must_use]
    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channels.push(channel.into());
        self
    }

    /// Builds the rule.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or exceeds
    /// [`AlertRule::MAX_NAME_LENGTH`].
    pub fn build(self) -> Result<AlertRule> {
        if self.name.is_empty() {
            return Err(ModelError::InvalidRule {
                reason: "rule name cannot be empty".to_string(),
            });
        }
        if self.name.len() > AlertRule::MAX_NAME_LENGTH {
            return Err(ModelError::InvalidRule {
                reason: format!(
                    "rule name exceeds maximum length of {} characters",
                    AlertRule::MAX_NAME_LENGTH
                ),
            });
        }

        let now = Utc::now();
        Ok(AlertRule {
            id: Uuid::new_v4(),
            tenant_id: self.tenant_id,
            name: self.name,
            description: self.description,
            enabled: self.enabled,
            filter: self.filter,
            severity: self.severity,
            threshold: self.threshold,
            window_mins: self.window_mins,
            channels: self.channels,
            last_triggered: None,
            created_at: now,
            updated_at: now,
        })
    }
}
