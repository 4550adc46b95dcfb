//! Parent-scoped list cache with local insert/update/remove.

use chrono::{DateTime, Utc};
use color_eyre::Result;
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::credentials::Credential;
use crate::task::{Task, TaskPoll};

use super::traits::{EntityPage, EntitySource, ListRecord};

/// Immutable view of the list, published after every load and mutation
#[derive(Debug, Clone)]
pub struct ListSnapshot<R> {
  pub items: Vec<R>,
  pub parent_id: Option<i64>,
  pub parent_label: String,
  pub loaded: bool,
  pub loaded_at: Option<DateTime<Utc>>,
}

impl<R> Default for ListSnapshot<R> {
  fn default() -> Self {
    Self {
      items: Vec::new(),
      parent_id: None,
      parent_label: String::new(),
      loaded: false,
      loaded_at: None,
    }
  }
}

struct PendingLoad<R> {
  parent_id: i64,
  task: Task<Result<EntityPage<R>>>,
}

/// Locally mutable projection of a remote collection scoped to one parent.
///
/// The collection is fetched once per parent id. After that the owner applies
/// `insert`, `update` and `remove` once the corresponding remote write has
/// succeeded, so the list never runs ahead of the server. Items are always
/// sorted by id, descending.
pub struct EntityListCache<R: ListRecord, S: EntitySource<R>> {
  source: Arc<S>,
  items: Vec<R>,
  parent_id: Option<i64>,
  parent_meta: serde_json::Value,
  parent_label: String,
  loaded: bool,
  loaded_at: Option<DateTime<Utc>>,
  pending: Option<PendingLoad<R>>,
  snapshot: watch::Sender<ListSnapshot<R>>,
}

impl<R: ListRecord, S: EntitySource<R>> EntityListCache<R, S> {
  pub fn new(source: Arc<S>) -> Self {
    let (snapshot, _) = watch::channel(ListSnapshot::default());
    Self {
      source,
      items: Vec::new(),
      parent_id: None,
      parent_meta: serde_json::Value::Null,
      parent_label: String::new(),
      loaded: false,
      loaded_at: None,
      pending: None,
      snapshot,
    }
  }

  /// Start loading the collection for `parent_id`.
  ///
  /// Returns `true` if a fetch was started. Does nothing when the parent id
  /// or credential is absent, when a load for this parent is in flight, or
  /// when it already completed. A different parent id discards the current
  /// list and any in-flight load before starting over.
  pub fn load(&mut self, parent_id: Option<i64>, credential: Option<&Credential>) -> bool {
    let (Some(parent_id), Some(credential)) = (parent_id, credential) else {
      debug!(?parent_id, "Load skipped, parent or credential not ready");
      return false;
    };

    if self.parent_id != Some(parent_id) {
      self.reset_for(parent_id);
    }

    if self.loaded || self.pending.is_some() {
      return false;
    }

    debug!(parent_id, "Loading entities");
    let source = Arc::clone(&self.source);
    let credential = credential.clone();
    let task = Task::spawn(async move { source.fetch_entities(parent_id, &credential).await });
    self.pending = Some(PendingLoad { parent_id, task });
    true
  }

  /// Clear the loaded guard for the current parent and load again.
  pub fn reload(&mut self, credential: Option<&Credential>) -> bool {
    if self.pending.is_some() {
      return false;
    }
    self.loaded = false;
    self.load(self.parent_id, credential)
  }

  fn reset_for(&mut self, parent_id: i64) {
    if let Some(old) = self.pending.take() {
      debug!(
        old = old.parent_id,
        new = parent_id,
        "Parent changed, dropping in-flight load"
      );
    }
    self.parent_id = Some(parent_id);
    self.items.clear();
    self.parent_meta = serde_json::Value::Null;
    self.parent_label.clear();
    self.loaded = false;
    self.loaded_at = None;
    self.publish();
  }

  /// Apply a finished load, if any. Returns `true` if state changed.
  pub fn poll(&mut self) -> bool {
    let Some(pending) = self.pending.as_mut() else {
      return false;
    };

    match pending.task.poll() {
      TaskPoll::Pending => false,
      TaskPoll::Ready(result) => {
        let parent_id = pending.parent_id;
        self.pending = None;
        self.apply(parent_id, result);
        true
      }
      TaskPoll::Lost => {
        warn!(parent_id = pending.parent_id, "Entity load task was lost");
        self.pending = None;
        true
      }
    }
  }

  /// Wait for the in-flight load, if any, and apply it.
  pub async fn settle(&mut self) {
    let Some(pending) = self.pending.take() else {
      return;
    };

    match pending.task.wait().await {
      Some(result) => self.apply(pending.parent_id, result),
      None => warn!(parent_id = pending.parent_id, "Entity load task was lost"),
    }
  }

  fn apply(&mut self, parent_id: i64, result: Result<EntityPage<R>>) {
    if self.parent_id != Some(parent_id) {
      debug!(parent_id, "Discarding load for a previous parent");
      return;
    }

    match result {
      Ok(page) => {
        let mut items = page.items;
        for item in &mut items {
          item.derive(&page.parent_label);
        }
        sort_descending(&mut items);

        info!(parent_id, count = items.len(), "Entities loaded");
        self.items = items;
        self.parent_meta = page.parent_meta;
        self.parent_label = page.parent_label;
        self.loaded = true;
        self.loaded_at = Some(Utc::now());
        self.publish();
      }
      Err(e) => {
        warn!(parent_id, error = %e, "Failed to load entities, keeping cached items");
      }
    }
  }

  /// Add a record that was already persisted remotely.
  pub fn insert(&mut self, mut record: R) {
    record.derive(&self.parent_label);
    self.items.insert(0, record);
    sort_descending(&mut self.items);
    self.publish();
  }

  /// Merge `patch` into the record with the same id. Unknown ids are ignored.
  pub fn update(&mut self, patch: R::Patch) {
    let id = R::patch_id(&patch);
    match self.items.iter_mut().find(|item| item.id() == id) {
      Some(item) => {
        item.apply_patch(patch);
        item.derive(&self.parent_label);
        self.publish();
      }
      None => debug!(id, "Update for unknown id ignored"),
    }
  }

  /// Drop the record with `id`. Unknown ids are ignored.
  pub fn remove(&mut self, id: i64) {
    let before = self.items.len();
    self.items.retain(|item| item.id() != id);
    if self.items.len() != before {
      self.publish();
    }
  }

  fn publish(&self) {
    self.snapshot.send_replace(ListSnapshot {
      items: self.items.clone(),
      parent_id: self.parent_id,
      parent_label: self.parent_label.clone(),
      loaded: self.loaded,
      loaded_at: self.loaded_at,
    });
  }

  /// Receiver that sees a new snapshot after every load and mutation
  pub fn subscribe(&self) -> watch::Receiver<ListSnapshot<R>> {
    self.snapshot.subscribe()
  }

  pub fn items(&self) -> &[R] {
    &self.items
  }

  pub fn get(&self, id: i64) -> Option<&R> {
    self.items.iter().find(|item| item.id() == id)
  }

  pub fn loaded(&self) -> bool {
    self.loaded
  }

  pub fn is_loading(&self) -> bool {
    self.pending.is_some()
  }

  pub fn parent_id(&self) -> Option<i64> {
    self.parent_id
  }

  pub fn parent_label(&self) -> &str {
    &self.parent_label
  }

  pub fn parent_meta(&self) -> &serde_json::Value {
    &self.parent_meta
  }

  pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
    self.loaded_at
  }
}

fn sort_descending<R: ListRecord>(items: &mut [R]) {
  items.sort_by_key(|item| Reverse(item.id()));
}
