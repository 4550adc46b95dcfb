use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// Key hint rendered in the header bar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  /// Sort order in the header, ascending
  pub priority: u8,
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// What the App should do with the view stack after a key press
pub enum ViewAction {
  None,
  /// Open a view on top of the current one
  Push(Box<dyn View>),
  /// Close the current view; closing the root quits
  Pop,
}

/// One screen on the App's view stack.
///
/// A view owns its modal state (open prompts, pending writes) and answers
/// keys with a [`ViewAction`]; components below it never touch the stack.
///
/// Views that load data asynchronously poll their caches and tasks in
/// `tick()`. Every view on the stack is ticked, not just the visible one,
/// so writes started from a covered view still land.
pub trait View {
  /// Only the top view receives keys
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Footer breadcrumb segment
  fn breadcrumb_label(&self) -> String;

  /// Short description of what the view shows, for the header
  fn context(&self) -> String {
    self.breadcrumb_label()
  }

  /// Latest error or notice to show in the footer
  fn status(&self) -> Option<&str> {
    None
  }

  /// Apply finished background work
  fn tick(&mut self) {}

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("q", "back").with_priority(90)]
  }
}
