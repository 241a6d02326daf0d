//! In-memory reference implementations of the storage traits.
//!
//! These backends hold everything in process memory behind `parking_lot`
//! locks. They are the default wiring for tests and single-node deployments;
//! anything that must survive a restart belongs in a real backend.

mod entries;
mod policies;
mod results;
mod rules;

pub use entries::{MemoryEntryStore, MemoryEntryStoreConfig};
pub use policies::MemoryRetentionPolicyStore;
pub use results::MemoryResultCache;
pub use rules::MemoryAlertRuleStore;
