use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Editing buffer behind a prompt. The cursor counts characters, not bytes.
///
/// Only edits and cursor moves are handled here; Enter and Esc belong to
/// whoever owns the input.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  text: String,
  cursor: usize,
}

impl TextInput {
  /// Start with `value`, cursor at the end
  pub fn with_value(value: impl Into<String>) -> Self {
    let text = value.into();
    let cursor = text.chars().count();
    Self { text, cursor }
  }

  pub fn value(&self) -> &str {
    &self.text
  }

  fn char_count(&self) -> usize {
    self.text.chars().count()
  }

  fn offset(&self, char_index: usize) -> usize {
    self
      .text
      .char_indices()
      .nth(char_index)
      .map_or(self.text.len(), |(i, _)| i)
  }

  /// Apply an editing key. Returns `false` for keys this buffer ignores.
  pub fn edit(&mut self, key: KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let end = self.char_count();

    match (key.code, ctrl) {
      (KeyCode::Home, _) | (KeyCode::Char('a'), true) => self.cursor = 0,
      (KeyCode::End, _) | (KeyCode::Char('e'), true) => self.cursor = end,
      (KeyCode::Left, _) => self.cursor = self.cursor.saturating_sub(1),
      (KeyCode::Right, _) => self.cursor = (self.cursor + 1).min(end),
      (KeyCode::Backspace, _) if self.cursor > 0 => {
        self.cursor -= 1;
        self.text.remove(self.offset(self.cursor));
      }
      (KeyCode::Delete, _) if self.cursor < end => {
        self.text.remove(self.offset(self.cursor));
      }
      (KeyCode::Backspace | KeyCode::Delete, _) => {}
      (KeyCode::Char('u'), true) => {
        self.text.drain(..self.offset(self.cursor));
        self.cursor = 0;
      }
      (KeyCode::Char(c), false) => {
        self.text.insert(self.offset(self.cursor), c);
        self.cursor += 1;
      }
      _ => return false,
    }
    true
  }

  /// Text before and after the cursor, for rendering
  pub fn split_at_cursor(&self) -> (&str, &str) {
    self.text.split_at(self.offset(self.cursor))
  }
}
