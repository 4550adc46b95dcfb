use crate::cache::{CapabilityKey, CapabilityScope, ListSnapshot, PermissionSet};
use crate::funds::types::Activity;
use crate::funds::FundsClient;
use crate::task::{Task, TaskPoll};
use crate::ui::renderfns::{available_color, format_amount};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};
use tokio::sync::watch;

const ACTIVITY_CLASS: &str = "Activity";

/// View for a single activity, following the list's published snapshots
pub struct ActivityDetailView {
  id: i64,
  snapshot: watch::Receiver<ListSnapshot<Activity>>,
  scope: CapabilityScope<FundsClient>,
  key: CapabilityKey,
  resolving: Option<Task<PermissionSet>>,
  parent_editable: bool,
}

impl ActivityDetailView {
  pub fn new(
    id: i64,
    snapshot: watch::Receiver<ListSnapshot<Activity>>,
    scope: CapabilityScope<FundsClient>,
    parent_editable: bool,
  ) -> Self {
    let mut view = Self {
      id,
      snapshot,
      scope,
      key: CapabilityKey::actions(ACTIVITY_CLASS, id),
      resolving: None,
      parent_editable,
    };
    view.resolve_actions();
    view
  }

  fn resolve_actions(&mut self) {
    if self.scope.is_resolved(&self.key) {
      return;
    }
    let scope = self.scope.clone();
    let key = self.key.clone();
    self.resolving = Some(Task::spawn(async move { scope.resolve(&key).await }));
  }

  fn refresh(&mut self) {
    self
      .scope
      .cache()
      .invalidate(&self.key, self.scope.credential());
    self.resolving = None;
    self.resolve_actions();
  }

  fn render_detail(&self, frame: &mut Frame, area: Rect) {
    let snapshot = self.snapshot.borrow();
    let activity = snapshot.items.iter().find(|a| a.id == self.id);

    let title = match activity {
      Some(activity) => format!(" #{} {} ", activity.id, activity.name),
      None => format!(" #{} ", self.id),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let Some(activity) = activity else {
      let paragraph = Paragraph::new("This activity is no longer in the list.")
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, inner);
      return;
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(6), // Fields
        Constraint::Length(1), // Separator
        Constraint::Min(1),    // Permitted actions
      ])
      .split(inner);

    let label = Style::default().fg(Color::DarkGray);
    let parent = if activity.parent_label.is_empty() {
      format!("#{}", activity.parent_id)
    } else {
      format!("{} (#{})", activity.parent_label, activity.parent_id)
    };
    let fields = vec![
      Line::from(vec![
        Span::styled("Initiative: ", label),
        Span::raw(parent),
      ]),
      Line::from(vec![
        Span::styled("Budget:     ", label),
        Span::raw(format_amount(activity.budget)),
      ]),
      Line::from(vec![
        Span::styled("Expenses:   ", label),
        Span::raw(format_amount(activity.expenses)),
      ]),
      Line::from(vec![
        Span::styled("Available:  ", label),
        Span::styled(
          format_amount(activity.derived.available),
          Style::default().fg(available_color(activity.derived.available, activity.budget)),
        ),
      ]),
      Line::from(vec![
        Span::styled("Hidden:     ", label),
        Span::raw(if activity.hidden { "yes" } else { "no" }),
      ]),
      Line::from(vec![
        Span::styled("Editable:   ", label),
        Span::raw(if self.parent_editable { "yes" } else { "no" }),
      ]),
    ];
    frame.render_widget(Paragraph::new(fields), chunks[0]);

    let sep = Paragraph::new("─".repeat(chunks[1].width as usize))
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(sep, chunks[1]);

    let actions: Vec<Line> = if self.resolving.is_some() {
      vec![Line::styled("Checking permitted actions...", label)]
    } else {
      let permissions = self.scope.permissions(&self.key);
      if permissions.actions.is_empty() {
        vec![Line::styled("No permitted actions.", label)]
      } else {
        std::iter::once(Line::styled("Permitted actions:", label))
          .chain(
            permissions
              .actions
              .iter()
              .map(|action| Line::from(format!("  {}", action))),
          )
          .collect()
      }
    };
    frame.render_widget(Paragraph::new(actions), chunks[2]);
  }
}

impl View for ActivityDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.refresh();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_detail(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("#{}", self.id)
  }

  fn context(&self) -> String {
    self
      .snapshot
      .borrow()
      .items
      .iter()
      .find(|a| a.id == self.id)
      .map(|a| a.name.clone())
      .unwrap_or_else(|| format!("Activity #{}", self.id))
  }

  fn tick(&mut self) {
    if let Some(task) = self.resolving.as_mut() {
      match task.poll() {
        TaskPoll::Pending => {}
        // The set lands in the shared cache; read it back from there
        TaskPoll::Ready(_) | TaskPoll::Lost => self.resolving = None,
      }
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("r", "refresh").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
