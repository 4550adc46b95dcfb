use serde::{Deserialize, Serialize};

/// Values computed locally from an activity's persisted fields
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Derived {
  /// Remaining budget, clamped at zero
  pub available: f64,
}

/// An activity scoped to an initiative
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
  pub id: i64,
  pub name: String,
  pub budget: f64,
  /// Signed: spending is recorded as a negative amount
  pub expenses: f64,
  pub hidden: bool,
  pub parent_id: i64,
  /// Denormalized initiative name, copied from the parent payload
  #[serde(default)]
  pub parent_label: String,
  #[serde(default)]
  pub derived: Derived,
}

/// Partial update for an activity. Absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivityPatch {
  pub id: i64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub budget: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub expenses: Option<f64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub hidden: Option<bool>,
}

impl ActivityPatch {
  pub fn new(id: i64) -> Self {
    Self {
      id,
      ..Self::default()
    }
  }

  pub fn name(mut self, name: impl Into<String>) -> Self {
    self.name = Some(name.into());
    self
  }

  pub fn hidden(mut self, hidden: bool) -> Self {
    self.hidden = Some(hidden);
    self
  }
}

/// Payload for creating an activity under an initiative
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewActivity {
  pub name: String,
  pub budget: f64,
  pub hidden: bool,
}
