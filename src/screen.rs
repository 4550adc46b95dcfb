//! Coordinator for the activities screen.
//!
//! Sequences the two caches: the activity list loads first, and only once it
//! has loaded is the parent initiative's permission set resolved. Views read
//! list state and permissions from here and report successful remote writes
//! back so the list stays in step with the server.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cache::{
  CapabilityCache, CapabilityKey, CapabilityScope, EntityListCache, EntitySource, ListSnapshot,
  PermissionSet, PermissionSource,
};
use crate::config::PermissionsConfig;
use crate::credentials::{Credential, CredentialSupplier};
use crate::funds::types::{Activity, ActivityPatch};
use crate::task::{Task, TaskPoll};

/// A remote write that succeeded and must be mirrored in the list
#[derive(Debug)]
pub enum WriteOutcome {
  Created(Activity),
  Updated(ActivityPatch),
  Removed(i64),
}

/// Which permission gates the screen's write actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenSettings {
  pub parent_class: String,
  pub gate_field: String,
}

impl From<&PermissionsConfig> for ScreenSettings {
  fn from(config: &PermissionsConfig) -> Self {
    Self {
      parent_class: config.parent_class.clone(),
      gate_field: config.gate_field.clone(),
    }
  }
}

enum PermissionState {
  /// Not requested for the current parent
  Idle,
  Resolving(Task<PermissionSet>),
  Resolved,
}

pub struct ActivitiesScreen<E: EntitySource<Activity>, P: PermissionSource> {
  list: EntityListCache<Activity, E>,
  scope: CapabilityScope<P>,
  settings: ScreenSettings,
  parent_id: Option<i64>,
  permissions: PermissionState,
}

impl<E: EntitySource<Activity>, P: PermissionSource> ActivitiesScreen<E, P> {
  pub fn new(
    entities: Arc<E>,
    capabilities: Arc<CapabilityCache<P>>,
    credentials: &dyn CredentialSupplier,
    settings: ScreenSettings,
    parent_id: Option<i64>,
  ) -> Self {
    Self {
      list: EntityListCache::new(entities),
      scope: CapabilityScope::new(capabilities, credentials.credential()),
      settings,
      parent_id,
      permissions: PermissionState::Idle,
    }
  }

  /// Trigger the initial load. Safe to call repeatedly.
  pub fn start(&mut self) {
    let credential = self.scope.credential().cloned();
    self.list.load(self.parent_id, credential.as_ref());
  }

  /// Apply finished fetches and start permission resolution once the list
  /// has loaded. Returns `true` if anything visible changed.
  pub fn tick(&mut self) -> bool {
    let mut changed = self.list.poll();
    self.request_permissions();

    if let PermissionState::Resolving(task) = &mut self.permissions {
      match task.poll() {
        TaskPoll::Pending => {}
        TaskPoll::Ready(_) | TaskPoll::Lost => {
          self.permissions = PermissionState::Resolved;
          changed = true;
        }
      }
    }

    changed
  }

  /// Wait until the list load and the permission fetch it triggers are done.
  pub async fn settle(&mut self) {
    self.list.settle().await;
    self.request_permissions();

    if !matches!(self.permissions, PermissionState::Resolving(_)) {
      return;
    }
    if let PermissionState::Resolving(task) =
      std::mem::replace(&mut self.permissions, PermissionState::Resolved)
    {
      task.wait().await;
    }
  }

  fn request_permissions(&mut self) {
    if !matches!(self.permissions, PermissionState::Idle) || !self.list.loaded() {
      return;
    }
    let Some(key) = self.parent_key() else {
      return;
    };

    debug!(%key, "Resolving screen permissions");
    let scope = self.scope.clone();
    self.permissions =
      PermissionState::Resolving(Task::spawn(async move { scope.resolve(&key).await }));
  }

  /// Switch to another parent. Both the list and the permission guard reset.
  pub fn set_parent(&mut self, parent_id: i64) {
    if self.parent_id == Some(parent_id) {
      return;
    }
    self.parent_id = Some(parent_id);
    self.permissions = PermissionState::Idle;
    let credential = self.scope.credential().cloned();
    self.list.load(Some(parent_id), credential.as_ref());
  }

  /// Refetch the list and the parent's permissions.
  pub fn reload(&mut self) {
    if let Some(key) = self.parent_key() {
      self.scope.cache().invalidate(&key, self.scope.credential());
    }
    self.permissions = PermissionState::Idle;
    let credential = self.scope.credential().cloned();
    self.list.reload(credential.as_ref());
  }

  /// Mirror a finished remote write issued while `parent_id` was shown.
  ///
  /// A failed write leaves the list untouched and its error is handed back.
  /// Writes for a parent that is no longer shown are dropped.
  pub fn record_write(&mut self, parent_id: i64, result: Result<WriteOutcome>) -> Result<()> {
    let outcome = result?;
    if self.parent_id != Some(parent_id) {
      debug!(parent_id, ?outcome, "Discarding write for a previous parent");
      return Ok(());
    }

    match outcome {
      WriteOutcome::Created(activity) => {
        info!(id = activity.id, parent_id, "Activity created");
        self.record_created(activity);
      }
      WriteOutcome::Updated(patch) => {
        info!(id = patch.id, parent_id, "Activity updated");
        self.record_updated(patch);
      }
      WriteOutcome::Removed(id) => {
        info!(id, parent_id, "Activity deleted");
        self.record_removed(id);
      }
    }
    Ok(())
  }

  // Local mutations, called after the remote write succeeded

  pub fn record_created(&mut self, activity: Activity) {
    self.list.insert(activity);
  }

  pub fn record_updated(&mut self, patch: ActivityPatch) {
    self.list.update(patch);
  }

  pub fn record_removed(&mut self, id: i64) {
    self.list.remove(id);
  }

  /// Permission key of the parent entity, once its id is known
  pub fn parent_key(&self) -> Option<CapabilityKey> {
    self
      .parent_id
      .map(|id| CapabilityKey::fields(self.settings.parent_class.clone(), id))
  }

  /// Whether create/edit actions are allowed. False until resolved.
  pub fn can_edit(&self) -> bool {
    self
      .parent_key()
      .map(|key| self.scope.has_field(&key, &self.settings.gate_field))
      .unwrap_or(false)
  }

  pub fn permissions_resolved(&self) -> bool {
    matches!(self.permissions, PermissionState::Resolved)
  }

  /// Handle for views that need permission checks
  pub fn scope(&self) -> CapabilityScope<P> {
    self.scope.clone()
  }

  pub fn credential(&self) -> Option<&Credential> {
    self.scope.credential()
  }

  pub fn items(&self) -> &[Activity] {
    self.list.items()
  }

  pub fn get(&self, id: i64) -> Option<&Activity> {
    self.list.get(id)
  }

  pub fn loaded(&self) -> bool {
    self.list.loaded()
  }

  pub fn is_loading(&self) -> bool {
    self.list.is_loading() || matches!(self.permissions, PermissionState::Resolving(_))
  }

  pub fn parent_id(&self) -> Option<i64> {
    self.parent_id
  }

  pub fn parent_label(&self) -> &str {
    self.list.parent_label()
  }

  pub fn subscribe(&self) -> tokio::sync::watch::Receiver<ListSnapshot<Activity>> {
    self.list.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::fakes::{FakeEntities, FakePermissions};
  use crate::credentials::StaticCredentials;
  use crate::funds::types::Derived;

  type Screen = ActivitiesScreen<FakeEntities<Activity>, FakePermissions>;

  fn activity(id: i64, parent_id: i64) -> Activity {
    Activity {
      id,
      name: format!("activity {}", id),
      budget: 1000.0,
      expenses: -300.0,
      hidden: false,
      parent_id,
      parent_label: String::new(),
      derived: Derived::default(),
    }
  }

  fn settings() -> ScreenSettings {
    ScreenSettings::from(&PermissionsConfig::default())
  }

  fn entities() -> Arc<FakeEntities<Activity>> {
    Arc::new(
      FakeEntities::new()
        .with_page(42, "Clean Water", vec![activity(1, 42), activity(2, 42)])
        .with_page(7, "Schools", vec![activity(8, 7)]),
    )
  }

  fn screen(
    entities: Arc<FakeEntities<Activity>>,
    permissions: Arc<FakePermissions>,
    credential: Option<&str>,
  ) -> Screen {
    let supplier = StaticCredentials(credential.map(Credential::new));
    ActivitiesScreen::new(
      entities,
      Arc::new(CapabilityCache::new(permissions)),
      &supplier,
      settings(),
      Some(42),
    )
  }

  fn ids(screen: &Screen) -> Vec<i64> {
    screen.items().iter().map(|a| a.id).collect()
  }

  #[tokio::test]
  async fn test_permissions_follow_list_load() {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(entities(), Arc::clone(&permissions), Some("t1"));

    assert!(!screen.can_edit());
    screen.start();
    // List not loaded yet, so no permission request
    assert_eq!(permissions.calls(), 0);

    screen.settle().await;

    assert!(screen.loaded());
    assert!(screen.permissions_resolved());
    assert!(screen.can_edit());
    assert_eq!(permissions.calls(), 1);
  }

  #[tokio::test]
  async fn test_tick_resolves_permissions_once() {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(entities(), Arc::clone(&permissions), Some("t1"));
    screen.start();

    for _ in 0..100 {
      screen.tick();
      if screen.permissions_resolved() {
        break;
      }
      tokio::task::yield_now().await;
    }
    for _ in 0..10 {
      screen.tick();
    }

    assert!(screen.can_edit());
    assert_eq!(permissions.calls(), 1);
  }

  #[tokio::test]
  async fn test_denied_permissions_disable_editing() {
    let permissions = Arc::new(FakePermissions::denying());
    let mut screen = screen(entities(), Arc::clone(&permissions), Some("t1"));
    screen.start();
    screen.settle().await;

    assert!(screen.loaded());
    assert!(screen.permissions_resolved());
    assert!(!screen.can_edit());
  }

  #[tokio::test]
  async fn test_missing_gate_field_disables_editing() {
    let permissions = Arc::new(FakePermissions::granting(&["budget"], &["delete"]));
    let mut screen = screen(entities(), permissions, Some("t1"));
    screen.start();
    screen.settle().await;

    assert!(!screen.can_edit());
  }

  #[tokio::test]
  async fn test_failed_load_skips_permission_fetch() {
    let entities = entities();
    entities.set_failing(true);
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(Arc::clone(&entities), Arc::clone(&permissions), Some("t1"));

    screen.start();
    screen.settle().await;

    assert!(!screen.loaded());
    assert!(!screen.permissions_resolved());
    assert_eq!(permissions.calls(), 0);

    entities.set_failing(false);
    screen.start();
    screen.settle().await;
    assert!(screen.can_edit());
  }

  #[tokio::test]
  async fn test_absent_credential_does_nothing() {
    let entities = entities();
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(Arc::clone(&entities), Arc::clone(&permissions), None);

    screen.start();
    screen.settle().await;

    assert_eq!(entities.calls(), 0);
    assert_eq!(permissions.calls(), 0);
    assert!(!screen.can_edit());
  }

  #[tokio::test]
  async fn test_set_parent_resets_both_guards() {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(entities(), Arc::clone(&permissions), Some("t1"));
    screen.start();
    screen.settle().await;

    screen.set_parent(7);
    assert!(!screen.loaded());
    assert!(!screen.can_edit());
    screen.settle().await;

    assert_eq!(screen.parent_label(), "Schools");
    assert_eq!(ids(&screen), vec![8]);
    assert!(screen.can_edit());
    assert_eq!(permissions.calls(), 2);
  }

  #[tokio::test]
  async fn test_reload_refetches_permissions() {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(entities(), Arc::clone(&permissions), Some("t1"));
    screen.start();
    screen.settle().await;

    permissions.set_fields(&[]);
    screen.reload();
    screen.settle().await;

    assert_eq!(permissions.calls(), 2);
    assert!(!screen.can_edit());
  }

  #[tokio::test]
  async fn test_leaf_scope_sees_screen_permissions() {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &["delete"]));
    let mut screen = screen(entities(), Arc::clone(&permissions), Some("t1"));
    let leaf = screen.scope();
    let key = screen.parent_key().unwrap();

    screen.start();
    screen.settle().await;

    assert!(leaf.has_action(&key, "delete"));
    assert_eq!(permissions.calls(), 1);
  }

  #[tokio::test]
  async fn test_local_mutations_route_to_list() {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(entities(), permissions, Some("t1"));
    screen.start();
    screen.settle().await;
    assert_eq!(ids(&screen), vec![2, 1]);

    screen.record_created(activity(3, 42));
    assert_eq!(ids(&screen), vec![3, 2, 1]);
    assert_eq!(screen.get(3).unwrap().parent_label, "Clean Water");

    screen.record_updated(ActivityPatch::new(2).name("X"));
    assert_eq!(screen.items()[1].name, "X");
    assert_eq!(ids(&screen), vec![3, 2, 1]);

    screen.record_removed(1);
    assert_eq!(ids(&screen), vec![3, 2]);
  }

  async fn loaded_screen() -> Screen {
    let permissions = Arc::new(FakePermissions::granting(&["activities"], &[]));
    let mut screen = screen(entities(), permissions, Some("t1"));
    screen.start();
    screen.settle().await;
    screen
  }

  #[tokio::test]
  async fn test_successful_writes_reach_the_list() {
    let mut screen = loaded_screen().await;

    screen
      .record_write(42, Ok(WriteOutcome::Created(activity(3, 42))))
      .unwrap();
    assert_eq!(ids(&screen), vec![3, 2, 1]);

    screen
      .record_write(42, Ok(WriteOutcome::Updated(ActivityPatch::new(2).hidden(true))))
      .unwrap();
    assert!(screen.get(2).unwrap().hidden);

    screen.record_write(42, Ok(WriteOutcome::Removed(1))).unwrap();
    assert_eq!(ids(&screen), vec![3, 2]);
  }

  #[tokio::test]
  async fn test_failed_write_leaves_list_untouched() {
    let mut screen = loaded_screen().await;
    let mut snapshots = screen.subscribe();
    snapshots.mark_unchanged();

    let result = screen.record_write(42, Err(color_eyre::eyre::eyre!("422 budget exceeded")));

    assert_eq!(result.unwrap_err().to_string(), "422 budget exceeded");
    assert_eq!(ids(&screen), vec![2, 1]);
    assert!(!screen.get(2).unwrap().hidden);
    assert!(!snapshots.has_changed().unwrap());
  }

  #[tokio::test]
  async fn test_write_for_previous_parent_is_dropped() {
    let mut screen = loaded_screen().await;
    screen.set_parent(7);
    screen.settle().await;
    assert_eq!(ids(&screen), vec![8]);

    // Issued while initiative 42 was shown, finished after the switch
    screen
      .record_write(42, Ok(WriteOutcome::Created(activity(3, 42))))
      .unwrap();
    screen.record_write(42, Ok(WriteOutcome::Removed(8))).unwrap();

    assert_eq!(ids(&screen), vec![8]);
  }
}
