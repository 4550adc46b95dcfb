//! Capability resolution: permission sets fetched once per key and shared.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::credentials::Credential;

use super::traits::PermissionSource;

/// Which kind of permission list a key asks the authority for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CapabilityKind {
  /// Field-level permissions
  Fields,
  /// Action-level permissions
  Actions,
}

/// Identifies the entity a permission set applies to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CapabilityKey {
  pub kind: CapabilityKind,
  pub entity_class: String,
  pub entity_id: i64,
}

impl CapabilityKey {
  pub fn fields(entity_class: impl Into<String>, entity_id: i64) -> Self {
    Self {
      kind: CapabilityKind::Fields,
      entity_class: entity_class.into(),
      entity_id,
    }
  }

  pub fn actions(entity_class: impl Into<String>, entity_id: i64) -> Self {
    Self {
      kind: CapabilityKind::Actions,
      entity_class: entity_class.into(),
      entity_id,
    }
  }
}

impl fmt::Display for CapabilityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let kind = match self.kind {
      CapabilityKind::Fields => "fields",
      CapabilityKind::Actions => "actions",
    };
    write!(f, "{}:{}:{}", self.entity_class, self.entity_id, kind)
  }
}

/// Allowed fields and actions for one entity. Empty means nothing is permitted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
  #[serde(default)]
  pub fields: BTreeSet<String>,
  #[serde(default)]
  pub actions: BTreeSet<String>,
}

impl PermissionSet {
  pub fn has_field(&self, name: &str) -> bool {
    self.fields.contains(name)
  }

  pub fn has_action(&self, name: &str) -> bool {
    self.actions.contains(name)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty() && self.actions.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EntryKey {
  /// Credential fingerprint, never the raw token
  credential: String,
  key: CapabilityKey,
}

type Slot = Arc<OnceCell<PermissionSet>>;

/// Keyed store of resolved permission sets.
///
/// Each (credential, key) pair owns a `OnceCell`: the first `resolve` runs
/// the fetch, concurrent callers wait on the same cell, and later callers
/// read the stored value. Fetch failures store the empty set.
pub struct CapabilityCache<S: PermissionSource> {
  source: Arc<S>,
  entries: Mutex<HashMap<EntryKey, Slot>>,
}

impl<S: PermissionSource> CapabilityCache<S> {
  pub fn new(source: Arc<S>) -> Self {
    Self {
      source,
      entries: Mutex::new(HashMap::new()),
    }
  }

  /// Map access never spans an await, so a poisoned lock still holds a
  /// consistent map.
  fn entries(&self) -> MutexGuard<'_, HashMap<EntryKey, Slot>> {
    self.entries.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn slot(&self, key: &CapabilityKey, credential: &Credential) -> Slot {
    let entry_key = EntryKey {
      credential: credential.fingerprint(),
      key: key.clone(),
    };
    Arc::clone(self.entries().entry(entry_key).or_default())
  }

  /// Resolve the permission set for `key`, fetching at most once.
  ///
  /// Without a credential nothing is fetched or stored and the empty set is
  /// returned.
  pub async fn resolve(&self, key: &CapabilityKey, credential: Option<&Credential>) -> PermissionSet {
    let Some(credential) = credential else {
      debug!(%key, "No credential, skipping permission fetch");
      return PermissionSet::default();
    };

    let slot = self.slot(key, credential);
    slot
      .get_or_init(|| self.fetch(key, credential))
      .await
      .clone()
  }

  /// Resolve several keys concurrently. Results are in `keys` order.
  pub async fn resolve_many(
    &self,
    keys: &[CapabilityKey],
    credential: Option<&Credential>,
  ) -> Vec<PermissionSet> {
    futures::future::join_all(keys.iter().map(|key| self.resolve(key, credential))).await
  }

  async fn fetch(&self, key: &CapabilityKey, credential: &Credential) -> PermissionSet {
    match self.source.fetch_permissions(key, credential).await {
      Ok(Some(set)) => {
        debug!(
          %key,
          fields = set.fields.len(),
          actions = set.actions.len(),
          "Permissions resolved"
        );
        set
      }
      Ok(None) => {
        warn!(%key, "Permission request denied, treating as no permissions");
        PermissionSet::default()
      }
      Err(e) => {
        warn!(%key, error = %e, "Permission fetch failed, treating as no permissions");
        PermissionSet::default()
      }
    }
  }

  /// Stored set for `key`, if a fetch has completed. Never fetches.
  pub fn peek(&self, key: &CapabilityKey, credential: Option<&Credential>) -> Option<PermissionSet> {
    let credential = credential?;
    let entry_key = EntryKey {
      credential: credential.fingerprint(),
      key: key.clone(),
    };
    self
      .entries()
      .get(&entry_key)
      .and_then(|slot| slot.get().cloned())
  }

  /// Drop the entry for `key` so the next `resolve` refetches.
  ///
  /// A fetch still in flight is left alone: later callers join it and its
  /// result becomes the stored value. Returns `true` if an entry was dropped.
  pub fn invalidate(&self, key: &CapabilityKey, credential: Option<&Credential>) -> bool {
    let Some(credential) = credential else {
      return false;
    };
    let entry_key = EntryKey {
      credential: credential.fingerprint(),
      key: key.clone(),
    };

    let mut entries = self.entries();
    match entries.get(&entry_key) {
      Some(slot) if slot.initialized() => {
        entries.remove(&entry_key);
        true
      }
      Some(_) => {
        debug!(%key, "Fetch in flight, keeping entry");
        false
      }
      None => false,
    }
  }

  /// Number of keys with a slot, resolved or in flight
  pub fn len(&self) -> usize {
    self.entries().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

/// Distribution handle for one screen.
///
/// Binds a shared cache to the screen's credential. Clones are cheap and are
/// handed to every view that needs permission checks; reads never fetch.
pub struct CapabilityScope<S: PermissionSource> {
  cache: Arc<CapabilityCache<S>>,
  credential: Option<Credential>,
}

impl<S: PermissionSource> Clone for CapabilityScope<S> {
  fn clone(&self) -> Self {
    Self {
      cache: Arc::clone(&self.cache),
      credential: self.credential.clone(),
    }
  }
}

impl<S: PermissionSource> CapabilityScope<S> {
  pub fn new(cache: Arc<CapabilityCache<S>>, credential: Option<Credential>) -> Self {
    Self { cache, credential }
  }

  pub fn credential(&self) -> Option<&Credential> {
    self.credential.as_ref()
  }

  pub fn cache(&self) -> &Arc<CapabilityCache<S>> {
    &self.cache
  }

  /// Resolve through the shared cache
  pub async fn resolve(&self, key: &CapabilityKey) -> PermissionSet {
    self.cache.resolve(key, self.credential.as_ref()).await
  }

  pub fn is_resolved(&self, key: &CapabilityKey) -> bool {
    self.cache.peek(key, self.credential.as_ref()).is_some()
  }

  /// Stored permissions for `key`, empty until resolved
  pub fn permissions(&self, key: &CapabilityKey) -> PermissionSet {
    self
      .cache
      .peek(key, self.credential.as_ref())
      .unwrap_or_default()
  }

  pub fn has_field(&self, key: &CapabilityKey, name: &str) -> bool {
    self.permissions(key).has_field(name)
  }

  pub fn has_action(&self, key: &CapabilityKey, name: &str) -> bool {
    self.permissions(key).has_action(name)
  }
}
