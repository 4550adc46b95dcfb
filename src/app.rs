use crate::cache::CapabilityCache;
use crate::config::Config;
use crate::credentials::CredentialSupplier;
use crate::event::{Event, EventHandler};
use crate::funds::FundsClient;
use crate::screen::{ActivitiesScreen, ScreenSettings};
use crate::ui;
use crate::ui::renderfns::extract_domain;
use crate::ui::view::{View, ViewAction};
use crate::ui::views::ActivityListView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const TICK_RATE: Duration = Duration::from_millis(100);

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  /// Build the view stack. Must run inside the tokio runtime: the root view
  /// starts loading immediately.
  pub fn new(config: &Config, client: FundsClient, credentials: &dyn CredentialSupplier) -> Self {
    let source = Arc::new(client.clone());
    let capabilities = Arc::new(CapabilityCache::new(Arc::clone(&source)));
    let screen = ActivitiesScreen::new(
      source,
      capabilities,
      credentials,
      ScreenSettings::from(&config.permissions),
      config.default_initiative,
    );

    let title = config
      .title
      .clone()
      .unwrap_or_else(|| extract_domain(&config.api.url).to_string());

    Self {
      view_stack: vec![Box::new(ActivityListView::new(screen, client))],
      title,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(TICK_RATE);
    info!("Console started");

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    info!("Console stopped");
    result
  }

  async fn event_loop<B: Backend>(
    &mut self,
    terminal: &mut Terminal<B>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => self.tick(),
      Event::Resize => {}
    }
  }

  /// Poll every view, not just the visible one
  fn tick(&mut self) {
    for view in &mut self.view_stack {
      view.tick();
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => return,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|view| view.breadcrumb_label())
      .collect()
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ApiConfig;
  use crate::credentials::StaticCredentials;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  // No initiative and no credential: the root view never reaches the network
  fn offline_app(title: Option<&str>) -> App {
    let config = Config {
      api: ApiConfig {
        url: "https://funds.example.org/api".to_string(),
        ..ApiConfig::default()
      },
      title: title.map(str::to_string),
      ..Config::default()
    };
    let client = FundsClient::new(&config).expect("client");
    App::new(&config, client, &StaticCredentials(None))
  }

  #[tokio::test]
  async fn test_title_defaults_to_api_domain() {
    assert_eq!(offline_app(None).title(), "funds.example.org");
    assert_eq!(offline_app(Some("Programme")).title(), "Programme");
  }

  #[tokio::test]
  async fn test_quit_on_root_pop() {
    let mut app = offline_app(None);
    assert_eq!(app.breadcrumb(), vec!["Activities".to_string()]);

    app.handle_key(key(KeyCode::Char('q')));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_ctrl_c_quits() {
    let mut app = offline_app(None);
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[tokio::test]
  async fn test_writes_refused_without_permissions() {
    let mut app = offline_app(None);
    app.handle_key(key(KeyCode::Char('n')));
    app.tick();

    assert!(!app.should_quit);
    let view = app.current_view_mut().expect("root view");
    assert_eq!(
      view.status(),
      Some("Not permitted to edit activities of this initiative")
    );
  }
}
