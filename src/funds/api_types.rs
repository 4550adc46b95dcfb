//! Serde-deserializable types matching the funds API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on application needs.

use serde::Deserialize;
use std::collections::BTreeSet;

use crate::cache::{EntityPage, PermissionSet};

use super::types::{Activity, Derived};

// ============================================================================
// Activities endpoint response
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiActivity {
  pub id: i64,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub budget: f64,
  #[serde(default)]
  pub expenses: f64,
  #[serde(default)]
  pub hidden: bool,
  #[serde(rename = "initiativeId")]
  pub initiative_id: Option<i64>,
}

impl ApiActivity {
  /// Convert to the domain type. `available` is left for the cache to derive.
  pub fn into_activity(self, parent_id: i64) -> Activity {
    Activity {
      id: self.id,
      name: self.name,
      budget: self.budget,
      expenses: self.expenses,
      hidden: self.hidden,
      parent_id: self.initiative_id.unwrap_or(parent_id),
      parent_label: String::new(),
      derived: Derived::default(),
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiActivitiesResponse {
  /// Opaque initiative payload; only `name` is interpreted
  #[serde(default)]
  pub initiative: serde_json::Value,
  #[serde(default)]
  pub activities: Vec<ApiActivity>,
}

impl ApiActivitiesResponse {
  pub fn into_page(self, parent_id: i64) -> EntityPage<Activity> {
    let parent_label = self
      .initiative
      .get("name")
      .and_then(|v| v.as_str())
      .unwrap_or_default()
      .to_string();

    EntityPage {
      items: self
        .activities
        .into_iter()
        .map(|a| a.into_activity(parent_id))
        .collect(),
      parent_meta: self.initiative,
      parent_label,
    }
  }
}

// ============================================================================
// Permission endpoints
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ApiFieldPermissions {
  #[serde(default)]
  pub fields: BTreeSet<String>,
}

impl From<ApiFieldPermissions> for PermissionSet {
  fn from(api: ApiFieldPermissions) -> Self {
    PermissionSet {
      fields: api.fields,
      ..PermissionSet::default()
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiActionPermissions {
  #[serde(default)]
  pub actions: BTreeSet<String>,
}

impl From<ApiActionPermissions> for PermissionSet {
  fn from(api: ApiActionPermissions) -> Self {
    PermissionSet {
      actions: api.actions,
      ..PermissionSet::default()
    }
  }
}
