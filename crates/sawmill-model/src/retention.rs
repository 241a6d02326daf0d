//! Per-tenant retention policies.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantId;

/// Retention window applied to tenants without an explicit policy, in days.
pub const DEFAULT_RETENTION_DAYS: i64 = 30;

/// Default storage ceiling for a tenant, in gigabytes.
pub const DEFAULT_MAX_SIZE_GB: u64 = 10;

/// How long a tenant's entries are kept before cleanup deletes them.
///
/// At most one policy exists per tenant; tenants without one fall back to
/// [`DEFAULT_RETENTION_DAYS`]. A window of zero or fewer days deletes
/// effectively all of the tenant's entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Unique identifier for this policy
    pub id: Uuid,
    /// Tenant the policy applies to
    pub tenant_id: TenantId,
    /// Retention window in days
    pub retention_days: i64,
    /// Storage ceiling in gigabytes (enforcement handled elsewhere)
    pub max_size_gb: u64,
    /// Whether expired entries should be archived before deletion
    pub archive_enabled: bool,
    /// Destination for archived entries
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive_path: Option<String>,
    /// When the policy was created
    pub created_at: DateTime<Utc>,
    /// When the policy was last modified
    pub updated_at: DateTime<Utc>,
}

impl RetentionPolicy {
    /// Creates a policy for a tenant with the given retention window.
    #[must_use]
    pub fn new(tenant_id: TenantId, retention_days: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            tenant_id,
            retention_days,
            max_size_gb: DEFAULT_MAX_SIZE_GB,
            archive_enabled: false,
            archive_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the storage ceiling.
    #[must_use]
    pub const fn with_max_size_gb(mut self, max_size_gb: u64) -> Self {
        self.max_size_gb = max_size_gb;
        self
    }

    /// Enables archival to the given path.
    #[must_use]
    pub fn with_archive(mut self, path: impl Into<String>) -> Self {
        self.archive_enabled = true;
        self.archive_path = Some(path.into());
        self
    }

    /// Computes the deletion cutoff relative to `now`.
    ///
    /// Entries recorded strictly before the cutoff are expired. A
    /// non-positive window puts the cutoff at or after `now`.
    #[must_use]
    pub fn cutoff_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.retention_days)
    }
}
