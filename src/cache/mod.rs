//! Screen-scoped caches for entity lists and permission sets.
//!
//! This module is independent of the funds API:
//! - `EntityListCache` keeps a parent-scoped list sorted by id and applies
//!   local insert/update/remove after remote writes succeed
//! - `CapabilityCache` resolves permission sets once per key and credential,
//!   collapsing concurrent requests into one fetch
//! - Both fail soft: errors are logged and degrade to stale or empty data

mod capability;
mod entity_list;
mod traits;

#[cfg(test)]
pub(crate) mod fakes;

pub use capability::{CapabilityCache, CapabilityKey, CapabilityKind, CapabilityScope, PermissionSet};
pub use entity_list::{EntityListCache, ListSnapshot};
pub use traits::{EntityPage, EntitySource, ListRecord, PermissionSource};
