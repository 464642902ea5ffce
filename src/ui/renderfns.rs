use ratatui::prelude::*;

use super::media_slot::MediaStatus;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Human-readable byte count
pub fn format_size(bytes: usize) -> String {
  const KIB: f64 = 1024.0;
  const MIB: f64 = KIB * 1024.0;

  let b = bytes as f64;
  if b >= MIB {
    format!("{:.1} MiB", b / MIB)
  } else if b >= KIB {
    format!("{:.1} KiB", b / KIB)
  } else {
    format!("{} B", bytes)
  }
}

/// Aspect ratio as width to height, e.g. `1.50:1`
pub fn format_ratio(ratio: f64) -> String {
  format!("{:.2}:1", ratio)
}

/// Span describing a row's media state
pub fn media_status_span(status: &MediaStatus) -> Span<'static> {
  match status {
    MediaStatus::Empty => Span::raw(""),
    MediaStatus::Loading => Span::styled("loading...", Style::default().fg(Color::Yellow)),
    MediaStatus::Ready { size, fingerprint } => Span::styled(
      format!("{} sha256:{}", format_size(*size), fingerprint),
      Style::default().fg(Color::Green),
    ),
    MediaStatus::Unavailable => {
      Span::styled("media unavailable", Style::default().fg(Color::Red))
    }
  }
}
