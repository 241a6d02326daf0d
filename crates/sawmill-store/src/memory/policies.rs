//! In-memory retention policy storage.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sawmill_model::{RetentionPolicy, TenantId};

use crate::error::{Result, StoreError};
use crate::traits::RetentionPolicyStore;

/// Thread-safe in-memory retention policy store, keyed by tenant.
#[derive(Debug, Clone, Default)]
pub struct MemoryRetentionPolicyStore {
    policies: Arc<RwLock<HashMap<TenantId, RetentionPolicy>>>,
}

impl MemoryRetentionPolicyStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored policies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.policies.read().len()
    }

    /// Returns true if no policies are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RetentionPolicyStore for MemoryRetentionPolicyStore {
    async fn upsert(&self, policy: &RetentionPolicy) -> Result<()> {
        self.policies
            .write()
            .insert(policy.tenant_id, policy.clone());
        Ok(())
    }

    async fn get(&self, tenant_id: TenantId) -> Result<Option<RetentionPolicy>> {
        Ok(self.policies.read().get(&tenant_id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<RetentionPolicy>> {
        let policies = self.policies.read();
        let mut all: Vec<RetentionPolicy> = policies.values().cloned().collect();
        all.sort_by_key(|policy| policy.tenant_id);
        Ok(all)
    }

    async fn delete(&self, tenant_id: TenantId) -> Result<()> {
        self.policies
            .write()
            .remove(&tenant_id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("retention policy for {tenant_id}")))
    }
}
