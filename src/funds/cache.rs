//! Caching implementations for funds types.

use color_eyre::Result;

use crate::cache::{CapabilityKey, EntityPage, EntitySource, ListRecord, PermissionSet, PermissionSource};
use crate::credentials::Credential;

use super::client::FundsClient;
use super::types::{Activity, ActivityPatch};

/// Remaining budget: `budget + expenses`, never below zero
pub fn available(budget: f64, expenses: f64) -> f64 {
  (budget + expenses).max(0.0)
}

// ============================================================================
// ListRecord implementations
// ============================================================================

impl ListRecord for Activity {
  type Patch = ActivityPatch;

  fn id(&self) -> i64 {
    self.id
  }

  fn patch_id(patch: &ActivityPatch) -> i64 {
    patch.id
  }

  fn apply_patch(&mut self, patch: ActivityPatch) {
    if let Some(name) = patch.name {
      self.name = name;
    }
    if let Some(budget) = patch.budget {
      self.budget = budget;
    }
    if let Some(expenses) = patch.expenses {
      self.expenses = expenses;
    }
    if let Some(hidden) = patch.hidden {
      self.hidden = hidden;
    }
  }

  fn derive(&mut self, parent_label: &str) {
    self.derived.available = available(self.budget, self.expenses);
    if !parent_label.is_empty() {
      self.parent_label = parent_label.to_string();
    }
  }
}

// ============================================================================
// Remote sources
// ============================================================================

impl EntitySource<Activity> for FundsClient {
  async fn fetch_entities(&self, parent_id: i64, credential: &Credential) -> Result<EntityPage<Activity>> {
    self.get_activities(parent_id, credential).await
  }
}

impl PermissionSource for FundsClient {
  async fn fetch_permissions(
    &self,
    key: &CapabilityKey,
    credential: &Credential,
  ) -> Result<Option<PermissionSet>> {
    self.get_permissions(key, credential).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::funds::types::Derived;

  fn activity(budget: f64, expenses: f64) -> Activity {
    Activity {
      id: 1,
      name: "Wells".to_string(),
      budget,
      expenses,
      hidden: false,
      parent_id: 42,
      parent_label: String::new(),
      derived: Derived::default(),
    }
  }

  #[test]
  fn test_available_subtracts_expenses() {
    assert_eq!(available(1000.0, -300.0), 700.0);
  }

  #[test]
  fn test_available_is_clamped() {
    assert_eq!(available(100.0, -500.0), 0.0);
  }

  #[test]
  fn test_derive_sets_available_and_label() {
    let mut record = activity(1000.0, -300.0);
    record.derive("Clean Water");
    assert_eq!(record.derived.available, 700.0);
    assert_eq!(record.parent_label, "Clean Water");
  }

  #[test]
  fn test_derive_keeps_label_when_parent_unknown() {
    let mut record = activity(10.0, 0.0);
    record.parent_label = "From server".to_string();
    record.derive("");
    assert_eq!(record.parent_label, "From server");
  }

  #[test]
  fn test_patch_is_shallow_merge() {
    let mut record = activity(1000.0, -300.0);
    record.apply_patch(ActivityPatch::new(1).hidden(true));
    assert!(record.hidden);
    assert_eq!(record.name, "Wells");
    assert_eq!(record.budget, 1000.0);

    record.apply_patch(ActivityPatch {
      expenses: Some(-1200.0),
      ..ActivityPatch::new(1)
    });
    record.derive("");
    assert_eq!(record.derived.available, 0.0);
  }
}
