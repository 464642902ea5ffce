use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use crate::feed::Post;
use crate::media::{BlobSource, FetchCoordinator, SlotId, SlotResolver};
use crate::ui::media_slot::MediaSlot;
use crate::ui::renderfns::{media_status_span, truncate};
use crate::ui::slot_list::SlotList;

/// Timeline of posts, one row per post
#[derive(Debug)]
pub struct FeedView {
  posts: Vec<Post>,
  list: SlotList,
}

impl FeedView {
  pub fn new(base: SlotId, posts: Vec<Post>) -> Self {
    let items = posts
      .iter()
      .map(|post| Some((post.content_id(), post.media_url.clone())))
      .collect();

    Self {
      posts,
      list: SlotList::new(base, items),
    }
  }

  pub fn list(&self) -> &SlotList {
    &self.list
  }

  pub fn list_mut(&mut self) -> &mut SlotList {
    &mut self.list
  }

  pub fn selected_post(&self) -> Option<&Post> {
    self.posts.get(self.list.selected())
  }

  /// Size the row pool to the space the list gets inside `height` lines
  pub fn layout<S: BlobSource>(&mut self, height: u16, coordinator: &mut FetchCoordinator<S>) {
    let rows = height.saturating_sub(2) as usize;
    self.list.set_viewport(rows, coordinator);
  }

  pub fn render(&self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Timeline ({}) ", self.posts.len()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if self.posts.is_empty() {
      let paragraph = Paragraph::new("No posts yet.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let offset = self.list.offset();
    let width = area.width as usize;

    let items: Vec<ListItem> = self
      .posts
      .iter()
      .enumerate()
      .skip(offset)
      .take(self.list.viewport())
      .map(|(index, post)| {
        let mut spans = vec![
          Span::styled(
            format!("{:<32}", truncate(post.title(), 32)),
            Style::default().fg(Color::White),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<14}", truncate(&post.author.display_name, 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:<5}", post.media_type.to_string()),
            Style::default().fg(Color::Magenta),
          ),
          Span::raw(" "),
        ];
        if let Some(status) = self.list.status(index) {
          spans.push(media_status_span(status));
        }
        // Only worth showing when the row has room for it
        if let Some(geotag) = post.geotag.filter(|_| width > 100) {
          spans.push(Span::styled(
            format!("  @ {}", geotag),
            Style::default().fg(Color::DarkGray),
          ));
        }
        ListItem::new(Line::from(spans))
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

    let mut state = ListState::default();
    state.select(Some(self.list.selected().saturating_sub(offset)));

    frame.render_stateful_widget(list, area, &mut state);
  }
}

impl SlotResolver for FeedView {
  type Slot = MediaSlot;

  fn resolve(&mut self, id: SlotId) -> Option<&mut MediaSlot> {
    self.list.resolve(id)
  }
}
