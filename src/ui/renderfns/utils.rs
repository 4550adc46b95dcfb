use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Format an amount with two decimals and thousands separators
pub fn format_amount(amount: f64) -> String {
  let formatted = format!("{:.2}", amount.abs());
  let (whole, fraction) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

  let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
  for (i, c) in whole.chars().enumerate() {
    if i > 0 && (whole.len() - i) % 3 == 0 {
      grouped.push(',');
    }
    grouped.push(c);
  }

  let sign = if amount < 0.0 && formatted != "0.00" { "-" } else { "" };
  format!("{}{}.{}", sign, grouped, fraction)
}

/// Display color for the available amount relative to the budget
pub fn available_color(available: f64, budget: f64) -> Color {
  if available <= 0.0 {
    Color::Red
  } else if budget > 0.0 && available < budget * 0.1 {
    Color::Yellow
  } else {
    Color::Green
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_short_string() {
    assert_eq!(truncate("hello", 10), "hello");
  }

  #[test]
  fn test_truncate_exact_length() {
    assert_eq!(truncate("hello", 5), "hello");
  }

  #[test]
  fn test_truncate_long_string() {
    assert_eq!(truncate("hello world", 8), "hello...");
  }

  #[test]
  fn test_truncate_multibyte() {
    assert_eq!(truncate("Éducation rurale", 8), "Éduc...");
  }

  #[test]
  fn test_format_amount() {
    assert_eq!(format_amount(0.0), "0.00");
    assert_eq!(format_amount(700.0), "700.00");
    assert_eq!(format_amount(1234567.891), "1,234,567.89");
    assert_eq!(format_amount(-300.5), "-300.50");
    assert_eq!(format_amount(-0.001), "0.00");
  }

  #[test]
  fn test_available_color() {
    assert_eq!(available_color(0.0, 100.0), Color::Red);
    assert_eq!(available_color(5.0, 100.0), Color::Yellow);
    assert_eq!(available_color(700.0, 1000.0), Color::Green);
    assert_eq!(available_color(10.0, 0.0), Color::Green);
  }
}
