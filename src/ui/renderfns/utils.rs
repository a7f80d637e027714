use ratatui::prelude::Color;

/// Truncate to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a user role
pub fn role_color(role: &str) -> Color {
  match role.to_lowercase().as_str() {
    "admin" => Color::Magenta,
    "recruiter" | "hr" => Color::Yellow,
    "candidate" | "employee" => Color::Green,
    _ => Color::White,
  }
}
