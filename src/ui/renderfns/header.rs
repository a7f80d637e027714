use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with title, backend host, and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  title: &str,
  base_url: &str,
  shortcuts: &[ShortcutInfo],
) {
  let mut spans = vec![
    Span::styled(format!(" {} ", title), Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_host(base_url)),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::raw(" "),
  ];

  let mut sorted: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  sorted.sort_by_key(|s| s.priority);
  for shortcut in sorted {
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(Color::Cyan),
    ));
    spans.push(Span::styled(
      format!(" {}  ", shortcut.label),
      Style::default().fg(Color::DarkGray),
    ));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host (and port) part of a URL
fn extract_host(url: &str) -> &str {
  let rest = url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url);
  rest.split('/').next().unwrap_or(rest)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_host() {
    assert_eq!(extract_host("http://localhost:5000"), "localhost:5000");
    assert_eq!(
      extract_host("https://jobs.example.com/api/"),
      "jobs.example.com"
    );
    assert_eq!(extract_host("localhost"), "localhost");
  }
}
