//! In-memory sources for cache tests.

use color_eyre::{eyre::eyre, Result};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::Semaphore;

use crate::credentials::Credential;

use super::capability::{CapabilityKey, PermissionSet};
use super::traits::{EntityPage, EntitySource, PermissionSource};

#[derive(Debug, Clone)]
enum Grant {
  Fixed(PermissionSet),
  ByEntityId,
  Denied,
  Failing,
}

/// Permission authority with a call counter and an optional release gate.
#[derive(Debug)]
pub struct FakePermissions {
  grant: Mutex<Grant>,
  calls: AtomicUsize,
  gate: Option<Semaphore>,
}

impl FakePermissions {
  fn with(grant: Grant) -> Self {
    Self {
      grant: Mutex::new(grant),
      calls: AtomicUsize::new(0),
      gate: None,
    }
  }

  pub fn granting(fields: &[&str], actions: &[&str]) -> Self {
    Self::with(Grant::Fixed(PermissionSet {
      fields: set(fields),
      actions: set(actions),
    }))
  }

  /// Grants a single field named `field-<entity id>`
  pub fn by_entity_id() -> Self {
    Self::with(Grant::ByEntityId)
  }

  pub fn denying() -> Self {
    Self::with(Grant::Denied)
  }

  pub fn failing() -> Self {
    Self::with(Grant::Failing)
  }

  /// Every fetch waits for one `release` before answering. Releases accumulate.
  pub fn gated(mut self) -> Self {
    self.gate = Some(Semaphore::new(0));
    self
  }

  pub fn release(&self) {
    if let Some(gate) = &self.gate {
      gate.add_permits(1);
    }
  }

  pub fn set_fields(&self, fields: &[&str]) {
    *self.grant.lock().unwrap() = Grant::Fixed(PermissionSet {
      fields: set(fields),
      actions: BTreeSet::new(),
    });
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl PermissionSource for FakePermissions {
  async fn fetch_permissions(
    &self,
    key: &CapabilityKey,
    _credential: &Credential,
  ) -> Result<Option<PermissionSet>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      if let Ok(permit) = gate.acquire().await {
        permit.forget();
      }
    }

    let grant = self.grant.lock().unwrap().clone();
    match grant {
      Grant::Fixed(granted) => Ok(Some(granted)),
      Grant::ByEntityId => Ok(Some(PermissionSet {
        fields: set(&[&format!("field-{}", key.entity_id)]),
        actions: BTreeSet::new(),
      })),
      Grant::Denied => Ok(None),
      Grant::Failing => Err(eyre!("connection refused")),
    }
  }
}

/// Entity source serving a fixed page per parent id.
#[derive(Debug)]
pub struct FakeEntities<R> {
  pages: Mutex<Vec<(i64, EntityPage<R>)>>,
  fail: Mutex<bool>,
  calls: AtomicUsize,
  gate: Option<Semaphore>,
}

impl<R: Clone + Send + Sync + 'static> FakeEntities<R> {
  pub fn new() -> Self {
    Self {
      pages: Mutex::new(Vec::new()),
      fail: Mutex::new(false),
      calls: AtomicUsize::new(0),
      gate: None,
    }
  }

  pub fn with_page(self, parent_id: i64, label: &str, items: Vec<R>) -> Self {
    self.pages.lock().unwrap().push((
      parent_id,
      EntityPage {
        items,
        parent_meta: serde_json::json!({ "id": parent_id, "name": label }),
        parent_label: label.to_string(),
      },
    ));
    self
  }

  pub fn gated(mut self) -> Self {
    self.gate = Some(Semaphore::new(0));
    self
  }

  pub fn release(&self) {
    if let Some(gate) = &self.gate {
      gate.add_permits(1);
    }
  }

  pub fn set_failing(&self, fail: bool) {
    *self.fail.lock().unwrap() = fail;
  }

  pub fn calls(&self) -> usize {
    self.calls.load(Ordering::SeqCst)
  }
}

impl<R: Clone + Send + Sync + 'static> EntitySource<R> for FakeEntities<R> {
  async fn fetch_entities(&self, parent_id: i64, _credential: &Credential) -> Result<EntityPage<R>> {
    self.calls.fetch_add(1, Ordering::SeqCst);
    if let Some(gate) = &self.gate {
      if let Ok(permit) = gate.acquire().await {
        permit.forget();
      }
    }

    if *self.fail.lock().unwrap() {
      return Err(eyre!("503 service unavailable"));
    }

    self
      .pages
      .lock()
      .unwrap()
      .iter()
      .find(|(id, _)| *id == parent_id)
      .map(|(_, page)| page.clone())
      .ok_or_else(|| eyre!("initiative {} not found", parent_id))
  }
}

fn set(names: &[&str]) -> BTreeSet<String> {
  names.iter().map(|s| s.to_string()).collect()
}
