use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::feed::Post;
use crate::media::{BlobSource, FetchCoordinator, SlotId, SlotResolver};
use crate::ui::media_slot::MediaSlot;
use crate::ui::renderfns::{format_ratio, media_status_span, truncate};
use crate::ui::slot_list::{SlotList, SLOTS_PER_LIST};

/// Lines taken by the post header above the comment list
const HEADER_HEIGHT: u16 = 5;

/// One post with its comments. Audio comments load their clips through the
/// shared coordinator, keyed by author and timestamp.
#[derive(Debug)]
pub struct DetailView {
  post: Post,
  header: SlotList,
  comments: SlotList,
}

impl DetailView {
  pub fn new(base: SlotId, post: Post) -> Self {
    let header = SlotList::new(
      base,
      vec![Some((post.content_id(), post.media_url.clone()))],
    );
    let comments = SlotList::new(
      base + SLOTS_PER_LIST,
      post
        .comments
        .iter()
        .map(|c| c.audio().map(|(id, url)| (id, url.clone())))
        .collect(),
    );

    Self {
      post,
      header,
      comments,
    }
  }

  pub fn comments(&self) -> &SlotList {
    &self.comments
  }

  pub fn comments_mut(&mut self) -> &mut SlotList {
    &mut self.comments
  }

  pub fn layout<S: BlobSource>(&mut self, height: u16, coordinator: &mut FetchCoordinator<S>) {
    self.header.set_viewport(1, coordinator);
    let rows = height.saturating_sub(HEADER_HEIGHT + 2) as usize;
    self.comments.set_viewport(rows, coordinator);
  }

  pub fn retry_failed<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) -> usize {
    self.header.retry_failed(coordinator) + self.comments.retry_failed(coordinator)
  }

  /// Give up on everything this view asked for
  pub fn close<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) {
    self.header.release_all(coordinator);
    self.comments.release_all(coordinator);
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(HEADER_HEIGHT), Constraint::Min(1)])
      .split(area);

    self.render_header(frame, chunks[0]);
    self.render_comments(frame, chunks[1]);
  }

  fn render_header(&self, frame: &mut Frame, area: Rect) {
    let post = &self.post;
    let label = Style::default().fg(Color::DarkGray);

    let mut media = vec![
      Span::styled("Media:  ", label),
      Span::styled(post.media_type.to_string(), Style::default().fg(Color::Magenta)),
      Span::raw(" "),
    ];
    if let Some(ratio) = post.ratio {
      media.push(Span::styled(format!("{} ", format_ratio(ratio)), label));
    }
    if let Some(status) = self.header.status(0) {
      media.push(media_status_span(status));
    }

    let lines = vec![
      Line::from(vec![
        Span::styled("Author: ", label),
        Span::styled(&post.author.display_name, Style::default().fg(Color::Cyan)),
        Span::styled(
          format!("  {}", post.timestamp.format("%Y-%m-%d %H:%M")),
          label,
        ),
      ]),
      Line::from(media),
      Line::from(vec![
        Span::styled("Where:  ", label),
        Span::raw(
          post
            .geotag
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string()),
        ),
      ]),
    ];

    let block = Block::default()
      .title(format!(" {} ", truncate(post.title(), 60)))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    frame.render_widget(Paragraph::new(lines).block(block), area);
  }

  fn render_comments(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Comments ({}) ", self.post.comments.len()))
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.post.comments.is_empty() {
      let paragraph = Paragraph::new("No comments yet.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let offset = self.comments.offset();
    let items: Vec<ListItem> = self
      .post
      .comments
      .iter()
      .enumerate()
      .skip(offset)
      .take(self.comments.viewport())
      .map(|(index, comment)| {
        let mut spans = vec![
          Span::styled(
            format!("{:<14}", truncate(&comment.author.display_name, 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
        ];
        if let Some(text) = &comment.text {
          spans.push(Span::raw(text.clone()));
          spans.push(Span::raw(" "));
        }
        if comment.audio_url.is_some() {
          spans.push(Span::styled("[audio] ", Style::default().fg(Color::Magenta)));
          if let Some(status) = self.comments.status(index) {
            spans.push(media_status_span(status));
          }
        }
        ListItem::new(Line::from(spans))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(self.comments.selected().saturating_sub(offset)));

    frame.render_stateful_widget(list, area, &mut state);
  }
}

impl SlotResolver for DetailView {
  type Slot = MediaSlot;

  fn resolve(&mut self, id: SlotId) -> Option<&mut MediaSlot> {
    match self.header.resolve(id) {
      Some(slot) => Some(slot),
      None => self.comments.resolve(id),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::feed::Feed;
  use crate::media::testing::FakeSource;
  use crate::media::{ContentId, MediaCache};
  use crate::ui::media_slot::MediaStatus;
  use bytes::Bytes;
  use std::sync::Arc;

  const FEED: &str = r#"
posts:
  - id: p1
    title: Harbor
    author: { uid: u1, display_name: Ana }
    timestamp: 2020-03-17T10:00:00Z
    media_type: image
    media_url: https://cdn.test/p1.jpg
    comments:
      - author: { uid: u2, display_name: Bo }
        timestamp: 2020-03-17T10:05:00Z
        text: lovely
      - author: { uid: u3, display_name: Cy }
        timestamp: 2020-03-17T10:06:00Z
        audio_url: https://cdn.test/c1.m4a
"#;

  fn post() -> Post {
    Feed::parse(FEED).unwrap().posts.remove(0)
  }

  #[tokio::test]
  async fn test_header_uses_cached_post_media() {
    let source = Arc::new(FakeSource::new());
    source.respond("https://cdn.test/c1.m4a", b"audio");
    let cache = MediaCache::unbounded();
    cache.store(Bytes::from_static(b"jpeg"), &ContentId::for_post("p1"));
    let mut coord = FetchCoordinator::new(Arc::clone(&source), cache);

    let mut view = DetailView::new(4096, post());
    view.layout(20, &mut coord);

    assert!(matches!(view.header.status(0), Some(MediaStatus::Ready { size: 4, .. })));
    assert_eq!(source.calls("https://cdn.test/p1.jpg"), 0);

    coord.settle(&mut view).await;
    assert_eq!(view.comments().status(0), Some(&MediaStatus::Empty));
    assert!(matches!(view.comments().status(1), Some(MediaStatus::Ready { size: 5, .. })));
  }

  #[tokio::test]
  async fn test_close_cancels_pending_audio() {
    let source = Arc::new(FakeSource::new());
    source.respond("https://cdn.test/p1.jpg", b"jpeg");
    source.gate("https://cdn.test/c1.m4a");
    let mut coord = FetchCoordinator::new(Arc::clone(&source), MediaCache::unbounded());

    let mut view = DetailView::new(4096, post());
    view.layout(20, &mut coord);
    view.close(&mut coord);
    coord.settle(&mut view).await;

    assert_eq!(coord.stats().canceled, 2);
    assert!(coord.cache().is_empty());
  }
}
