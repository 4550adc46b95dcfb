use super::input::TextInput;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the prompt that the parent view handles
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptEvent {
  /// Enter pressed with a non-empty value (trimmed)
  Submitted(String),
  Cancelled,
}

/// Modal single-line prompt, e.g. "New activity" or "Rename"
#[derive(Debug, Clone)]
pub struct Prompt {
  title: String,
  input: TextInput,
}

impl Prompt {
  pub fn new(title: impl Into<String>) -> Self {
    Self {
      title: title.into(),
      input: TextInput::default(),
    }
  }

  pub fn with_value(title: impl Into<String>, value: &str) -> Self {
    Self {
      title: title.into(),
      input: TextInput::with_value(value),
    }
  }

  pub fn value(&self) -> &str {
    self.input.value()
  }

  /// The prompt is modal: every key is consumed. `None` means there is
  /// nothing for the parent to act on yet.
  pub fn handle_key(&mut self, key: KeyEvent) -> Option<PromptEvent> {
    match key.code {
      KeyCode::Esc => Some(PromptEvent::Cancelled),
      KeyCode::Enter => {
        let value = self.input.value().trim();
        (!value.is_empty()).then(|| PromptEvent::Submitted(value.to_string()))
      }
      _ => {
        self.input.edit(key);
        None
      }
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let width = (area.width * 60 / 100).clamp(30, 70).min(area.width);
    let height = 3.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 3;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let (before, after) = self.input.split_at_cursor();
    let line = Line::from(vec![
      Span::raw(before),
      Span::styled("_", Style::default().fg(Color::Yellow)),
      Span::raw(after),
    ]);
    frame.render_widget(Paragraph::new(line), inner);
  }
}
