use crate::funds::types::{Activity, ActivityPatch, NewActivity};
use crate::funds::FundsClient;
use crate::screen::WriteOutcome;
use crate::task::{Task, TaskPoll};
use crate::ui::components::{Prompt, PromptEvent};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{available_color, format_amount, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{ActivityDetailView, ConsoleScreen};
use color_eyre::{eyre::eyre, Result};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::future::Future;
use tracing::warn;

/// Remote write in flight, tagged with the initiative it was issued for
struct PendingWrite {
  parent_id: i64,
  task: Task<Result<WriteOutcome>>,
}

enum PromptKind {
  Create,
  Rename(i64),
}

/// Root view: the activities of one initiative
pub struct ActivityListView {
  screen: ConsoleScreen,
  client: FundsClient,
  list_state: ListState,
  prompt: Option<(PromptKind, Prompt)>,
  writes: Vec<PendingWrite>,
  status: Option<String>,
}

impl ActivityListView {
  pub fn new(mut screen: ConsoleScreen, client: FundsClient) -> Self {
    let status = if screen.credential().is_none() {
      Some("No API token: set FUNDSCTL_API_TOKEN".to_string())
    } else if screen.parent_id().is_none() {
      Some("No initiative selected: use --initiative or default_initiative".to_string())
    } else {
      None
    };

    // Start fetching immediately
    screen.start();

    Self {
      screen,
      client,
      list_state: ListState::default(),
      prompt: None,
      writes: Vec::new(),
      status,
    }
  }

  fn selected(&self) -> Option<&Activity> {
    self
      .list_state
      .selected()
      .and_then(|idx| self.screen.items().get(idx))
  }

  /// Spawn a remote write. The list changes only once it succeeds.
  fn spawn_write<F>(&mut self, write: F)
  where
    F: Future<Output = Result<WriteOutcome>> + Send + 'static,
  {
    let Some(parent_id) = self.screen.parent_id() else {
      return;
    };
    self.writes.push(PendingWrite {
      parent_id,
      task: Task::spawn(write),
    });
  }

  fn create(&mut self, name: String) {
    let (Some(parent_id), Some(credential)) =
      (self.screen.parent_id(), self.screen.credential().cloned())
    else {
      return;
    };
    let client = self.client.clone();
    let activity = NewActivity {
      name,
      budget: 0.0,
      hidden: false,
    };
    self.spawn_write(async move {
      client
        .create_activity(parent_id, &activity, &credential)
        .await
        .map(WriteOutcome::Created)
    });
  }

  fn update(&mut self, patch: ActivityPatch) {
    let Some(credential) = self.screen.credential().cloned() else {
      return;
    };
    let client = self.client.clone();
    self.spawn_write(async move {
      client.update_activity(&patch, &credential).await?;
      Ok(WriteOutcome::Updated(patch))
    });
  }

  fn delete(&mut self, id: i64) {
    let Some(credential) = self.screen.credential().cloned() else {
      return;
    };
    let client = self.client.clone();
    self.spawn_write(async move {
      client.delete_activity(id, &credential).await?;
      Ok(WriteOutcome::Removed(id))
    });
  }

  fn poll_writes(&mut self) {
    let mut finished = Vec::new();
    self.writes.retain_mut(|write| match write.task.poll() {
      TaskPoll::Pending => true,
      TaskPoll::Ready(result) => {
        finished.push((write.parent_id, result));
        false
      }
      TaskPoll::Lost => {
        finished.push((write.parent_id, Err(eyre!("Write task was lost"))));
        false
      }
    });

    for (parent_id, result) in finished {
      if let Err(e) = self.screen.record_write(parent_id, result) {
        warn!(parent_id, error = %e, "Activity write failed");
        self.status = Some(e.to_string());
      }
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.screen.items().len();
    ensure_valid_selection(&mut self.list_state, len);

    let label = match self.screen.parent_id() {
      Some(id) if self.screen.parent_label().is_empty() => format!("Initiative #{}", id),
      Some(id) => format!("{} #{}", self.screen.parent_label(), id),
      None => "Activities".to_string(),
    };
    let title = if self.screen.is_loading() {
      format!(" {} (loading...) ", label)
    } else {
      format!(" {} ({} activities) ", label, len)
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.screen.is_loading() {
      let content = if self.screen.loaded() {
        "No activities for this initiative."
      } else {
        "Activities not loaded. Press 'r' to retry."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    // Collect items first to avoid borrow conflicts with list_state
    let items: Vec<ListItem> = self
      .screen
      .items()
      .iter()
      .map(|activity| {
        let name_style = if activity.hidden {
          Style::default().fg(Color::DarkGray)
        } else {
          Style::default()
        };
        let line = Line::from(vec![
          Span::styled(
            format!("{:<8}", activity.id),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<32}", truncate(&activity.name, 32)),
            name_style,
          ),
          Span::raw(format!("{:>14}", format_amount(activity.budget))),
          Span::raw(format!("{:>14}", format_amount(activity.expenses))),
          Span::styled(
            format!("{:>14}", format_amount(activity.derived.available)),
            Style::default().fg(available_color(activity.derived.available, activity.budget)),
          ),
          Span::styled(
            if activity.hidden { "  hidden" } else { "" },
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_prompt(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let (_, prompt) = self.prompt.as_mut()?;
    match prompt.handle_key(key) {
      Some(PromptEvent::Submitted(value)) => {
        if let Some((kind, _)) = self.prompt.take() {
          match kind {
            PromptKind::Create => self.create(value),
            PromptKind::Rename(id) => self.update(ActivityPatch::new(id).name(value)),
          }
        }
      }
      Some(PromptEvent::Cancelled) => self.prompt = None,
      None => {}
    }
    Some(ViewAction::None)
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        Some(ViewAction::None)
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        Some(ViewAction::None)
      }
      _ => None,
    }
  }

  fn handle_writes(&mut self, key: KeyEvent) -> Option<ViewAction> {
    if !matches!(key.code, KeyCode::Char('n' | 'e' | 'h' | 'd')) {
      return None;
    }
    if !self.screen.can_edit() {
      self.status = Some("Not permitted to edit activities of this initiative".to_string());
      return Some(ViewAction::None);
    }

    self.status = None;
    match key.code {
      KeyCode::Char('n') => {
        self.prompt = Some((PromptKind::Create, Prompt::new("New activity")));
      }
      KeyCode::Char('e') => {
        if let Some(activity) = self.selected() {
          let id = activity.id;
          let prompt = Prompt::with_value("Rename activity", &activity.name);
          self.prompt = Some((PromptKind::Rename(id), prompt));
        }
      }
      KeyCode::Char('h') => {
        if let Some(activity) = self.selected() {
          let patch = ActivityPatch::new(activity.id).hidden(!activity.hidden);
          self.update(patch);
        }
      }
      KeyCode::Char('d') => {
        if let Some(id) = self.selected().map(|a| a.id) {
          self.delete(id);
        }
      }
      _ => {}
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('r') => {
        self.status = None;
        self.screen.reload();
        Some(ViewAction::None)
      }
      KeyCode::Enter => {
        let activity = self.selected()?;
        Some(ViewAction::Push(Box::new(ActivityDetailView::new(
          activity.id,
          self.screen.subscribe(),
          self.screen.scope(),
          self.screen.can_edit(),
        ))))
      }
      KeyCode::Char('q') | KeyCode::Esc => Some(ViewAction::Pop),
      _ => None,
    }
  }
}

impl View for ActivityListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_prompt(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_writes(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    if let Some((_, prompt)) = &self.prompt {
      prompt.render_overlay(frame, area);
    }
  }

  fn breadcrumb_label(&self) -> String {
    match self.screen.parent_id() {
      Some(id) => format!("Activities [{}]", id),
      None => "Activities".to_string(),
    }
  }

  fn context(&self) -> String {
    let access = if !self.screen.permissions_resolved() {
      "checking access"
    } else if self.screen.can_edit() {
      "editable"
    } else {
      "read-only"
    };
    if self.screen.parent_label().is_empty() {
      access.to_string()
    } else {
      format!("{} · {}", self.screen.parent_label(), access)
    }
  }

  fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  fn tick(&mut self) {
    self.screen.tick();
    self.poll_writes();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.prompt.is_some() {
      return vec![
        ShortcutInfo::new("enter", "save").with_priority(10),
        ShortcutInfo::new("esc", "cancel").with_priority(20),
      ];
    }

    let mut shortcuts = vec![
      ShortcutInfo::new("enter", "details").with_priority(10),
      ShortcutInfo::new("r", "reload").with_priority(60),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ];
    if self.screen.can_edit() {
      shortcuts.extend([
        ShortcutInfo::new("n", "new").with_priority(20),
        ShortcutInfo::new("e", "rename").with_priority(30),
        ShortcutInfo::new("h", "hide").with_priority(40),
        ShortcutInfo::new("d", "delete").with_priority(50),
      ]);
    }
    shortcuts
  }
}
