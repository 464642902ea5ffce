use crate::event::{Event, EventHandler};
use crate::feed::Feed;
use crate::media::{BlobSource, FetchCoordinator, SlotId, SlotResolver, UrlBlobSource};
use crate::ui;
use crate::ui::media_slot::MediaSlot;
use crate::ui::slot_list::SLOTS_PER_LIST;
use crate::ui::views::{DetailView, FeedView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

/// Slot ids for the timeline start here; the open post's views follow it.
const FEED_SLOT_BASE: SlotId = 0;
const DETAIL_SLOT_BASE: SlotId = SLOTS_PER_LIST;

const TICK_RATE: Duration = Duration::from_millis(100);

/// View state - each variant owns its data
#[derive(Debug)]
pub enum ViewState {
  Feed(FeedView),
  Detail(DetailView),
}

impl ViewState {
  fn layout<S: BlobSource>(&mut self, height: u16, coordinator: &mut FetchCoordinator<S>) {
    match self {
      ViewState::Feed(view) => view.layout(height, coordinator),
      ViewState::Detail(view) => view.layout(height, coordinator),
    }
  }

  fn move_selection<S: BlobSource>(&mut self, delta: isize, coordinator: &mut FetchCoordinator<S>) {
    match self {
      ViewState::Feed(view) => view.list_mut().move_selection(delta, coordinator),
      ViewState::Detail(view) => view.comments_mut().move_selection(delta, coordinator),
    }
  }

  fn retry_failed<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) -> usize {
    match self {
      ViewState::Feed(view) => view.list_mut().retry_failed(coordinator),
      ViewState::Detail(view) => view.retry_failed(coordinator),
    }
  }

  fn close<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) {
    match self {
      ViewState::Feed(view) => view.list_mut().release_all(coordinator),
      ViewState::Detail(view) => view.close(coordinator),
    }
  }
}

impl SlotResolver for ViewState {
  type Slot = MediaSlot;

  fn resolve(&mut self, id: SlotId) -> Option<&mut MediaSlot> {
    match self {
      ViewState::Feed(view) => view.resolve(id),
      ViewState::Detail(view) => view.resolve(id),
    }
  }
}

/// Routes deliveries to whichever view on the stack owns the slot id
struct StackSlots<'a>(&'a mut [ViewState]);

impl SlotResolver for StackSlots<'_> {
  type Slot = MediaSlot;

  fn resolve(&mut self, id: SlotId) -> Option<&mut MediaSlot> {
    self.0.iter_mut().find_map(|view| view.resolve(id))
  }
}

/// Runs a closure when dropped
struct OnDrop<F: FnOnce()>(Option<F>);

impl<F: FnOnce()> OnDrop<F> {
  fn new(f: F) -> Self {
    Self(Some(f))
  }
}

impl<F: FnOnce()> Drop for OnDrop<F> {
  fn drop(&mut self) {
    if let Some(f) = self.0.take() {
      f();
    }
  }
}

fn restore_terminal() {
  if let Err(e) = disable_raw_mode() {
    tracing::warn!(error = %e, "Failed to disable raw mode");
  }
  if let Err(e) = stdout().execute(LeaveAlternateScreen) {
    tracing::warn!(error = %e, "Failed to leave alternate screen");
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - the feed is always at index 0
  view_stack: Vec<ViewState>,

  coordinator: FetchCoordinator<UrlBlobSource>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(feed: Feed, coordinator: FetchCoordinator<UrlBlobSource>) -> Self {
    Self {
      view_stack: vec![ViewState::Feed(FeedView::new(FEED_SLOT_BASE, feed.posts))],
      coordinator,
      should_quit: false,
    }
  }

  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  pub fn coordinator(&self) -> &FetchCoordinator<UrlBlobSource> {
    &self.coordinator
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal. The guard restores it on every exit path.
    enable_raw_mode()?;
    let _restore = OnDrop::new(restore_terminal);
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    let canceled = self.coordinator.cancel_all();
    tracing::info!(canceled, stats = ?self.coordinator.stats(), "Shutting down");

    result
  }

  async fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(TICK_RATE);

    while !self.should_quit {
      // Status bar takes the last line
      let height = terminal.size()?.height.saturating_sub(1);
      if let Some(view) = self.view_stack.last_mut() {
        view.layout(height, &mut self.coordinator);
      }

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
      // Layout is recomputed before the next draw
      Event::Resize => {}
      Event::Tick => {}
    }
    self
      .coordinator
      .poll(&mut StackSlots(&mut self.view_stack));
  }

  fn handle_key(&mut self, key: KeyEvent) {
    match key.code {
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }
      KeyCode::Char('q') | KeyCode::Esc => self.go_back(),
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::PageUp => self.move_selection(-10),
      KeyCode::PageDown => self.move_selection(10),
      KeyCode::Enter => self.open_selected(),
      KeyCode::Char('r') => {
        if let Some(view) = self.view_stack.last_mut() {
          let retried = view.retry_failed(&mut self.coordinator);
          tracing::debug!(retried, "Retrying failed media");
        }
      }
      _ => {}
    }
  }

  fn move_selection(&mut self, delta: isize) {
    if let Some(view) = self.view_stack.last_mut() {
      view.move_selection(delta, &mut self.coordinator);
    }
  }

  fn open_selected(&mut self) {
    let Some(ViewState::Feed(feed)) = self.view_stack.last() else {
      return;
    };
    let Some(post) = feed.selected_post().cloned() else {
      return;
    };

    tracing::info!(post = %post.id, comments = post.comments.len(), "Opening post");
    self
      .view_stack
      .push(ViewState::Detail(DetailView::new(DETAIL_SLOT_BASE, post)));
  }

  fn go_back(&mut self) {
    if self.view_stack.len() > 1 {
      if let Some(mut view) = self.view_stack.pop() {
        view.close(&mut self.coordinator);
      }
    } else {
      self.should_quit = true;
    }
  }
}
