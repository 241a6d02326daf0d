//! In-memory alert rule storage.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use sawmill_model::{AlertRule, TenantId};
use uuid::Uuid;

use crate::error::{Result, StoreError};
use crate::traits::AlertRuleStore;

/// Thread-safe in-memory alert rule store.
#[derive(Debug, Clone, Default)]
pub struct MemoryAlertRuleStore {
    rules: Arc<RwLock<HashMap<Uuid, AlertRule>>>,
}

impl MemoryAlertRuleStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns true if no rules are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AlertRuleStore for MemoryAlertRuleStore {
    async fn create(&self, rule: &AlertRule) -> Result<()> {
        let mut rules = self.rules.write();
        if rules.contains_key(&rule.id) {
            return Err(StoreError::Write(format!(
                "alert rule already exists: {}",
                rule.id
            )));
        }
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update(&self, rule: &AlertRule) -> Result<()> {
        let mut rules = self.rules.write();
        match rules.get_mut(&rule.id) {
            Some(existing) => {
                *existing = rule.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("alert rule {}", rule.id))),
        }
    }

    async fn get(&self, id: Uuid) -> Result<Option<AlertRule>> {
        Ok(self.rules.read().get(&id).cloned())
    }

    async fn list(&self, tenant_id: Option<TenantId>) -> Result<Vec<AlertRule>> {
        let rules = self.rules.read();
        let mut matching: Vec<AlertRule> = rules
            .values()
            .filter(|rule| tenant_id.is_none_or(|tenant| rule.tenant_id == tenant))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn list_enabled(&self) -> Result<Vec<AlertRule>> {
        let rules = self.rules.read();
        let mut matching: Vec<AlertRule> =
            rules.values().filter(|rule| rule.enabled).cloned().collect();
        matching.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(matching)
    }

    async fn set_enabled(&self, id: Uuid, enabled: bool) -> Result<()> {
        let mut rules = self.rules.write();
        let rule = rules
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("alert rule {id}")))?;
        rule.enabled = enabled;
        rule.updated_at = Utc::now();
        Ok(())
    }

    async fn update_last_triggered(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut rules = self.rules.write();
        let rule = rules
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("alert rule {id}")))?;
        rule.last_triggered = Some(at);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut rules = self.rules.write();
        rules
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::NotFound(format!("alert rule {id}")))
    }
}
