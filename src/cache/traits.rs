//! Core traits and types for the caching system.

use color_eyre::Result;
use std::future::Future;

use crate::credentials::Credential;

use super::capability::{CapabilityKey, PermissionSet};

/// Trait for records held in an [`EntityListCache`](super::EntityListCache).
///
/// Implementors provide a stable id, a shallow-merge patch type, and a pure
/// derivation step that the cache applies after every load and mutation.
pub trait ListRecord: Clone + Send + Sync + 'static {
  /// Partial update applied by `update`
  type Patch: Send;

  /// Unique, stable identifier (e.g., activity id)
  fn id(&self) -> i64;

  /// Id of the record a patch targets
  fn patch_id(patch: &Self::Patch) -> i64;

  /// Merge the patch's present fields into this record
  fn apply_patch(&mut self, patch: Self::Patch);

  /// Recompute local-only fields. `parent_label` is the denormalized parent name.
  fn derive(&mut self, parent_label: &str);
}

/// One fetched collection plus the parent it is scoped to.
#[derive(Debug, Clone, Default)]
pub struct EntityPage<R> {
  pub items: Vec<R>,
  /// Opaque parent payload, kept as returned by the remote API
  pub parent_meta: serde_json::Value,
  pub parent_label: String,
}

/// Remote source of a parent-scoped collection.
pub trait EntitySource<R>: Send + Sync + 'static {
  fn fetch_entities(
    &self,
    parent_id: i64,
    credential: &Credential,
  ) -> impl Future<Output = Result<EntityPage<R>>> + Send;
}

/// Remote authority for permission sets.
pub trait PermissionSource: Send + Sync + 'static {
  /// `Ok(None)` means the authority denied the request.
  fn fetch_permissions(
    &self,
    key: &CapabilityKey,
    credential: &Credential,
  ) -> impl Future<Output = Result<Option<PermissionSet>>> + Send;
}
