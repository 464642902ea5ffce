//! Scrollable list whose visible rows are a fixed pool of reusable slots.

use url::Url;

use crate::media::{BlobSource, ContentId, DisplaySlot, FetchCoordinator, SlotId, SlotResolver};

use super::media_slot::{MediaSlot, MediaStatus};

/// Slot ids handed to one list. Lists in different views get disjoint ranges.
pub const SLOTS_PER_LIST: usize = 1024;

/// Media behind one list item, if it has any
pub type MediaKey = Option<(ContentId, Url)>;

/// Selection and scroll state for a list of items, with one [`MediaSlot`]
/// per visible row.
///
/// Scrolling rebinds rows to different items. A row leaving an item releases
/// its interest in that item's fetch, which cancels the fetch once no other
/// row is waiting on it.
#[derive(Debug)]
pub struct SlotList {
  base: SlotId,
  items: Vec<MediaKey>,
  selected: usize,
  offset: usize,
  rows: Vec<MediaSlot>,
}

impl SlotList {
  pub fn new(base: SlotId, items: Vec<MediaKey>) -> Self {
    Self {
      base,
      items,
      selected: 0,
      offset: 0,
      rows: Vec::new(),
    }
  }

  pub fn selected(&self) -> usize {
    self.selected
  }

  pub fn offset(&self) -> usize {
    self.offset
  }

  /// Number of rows currently on screen
  pub fn viewport(&self) -> usize {
    self.rows.len()
  }

  /// Media state of the item at `index`, if that item is on screen
  pub fn status(&self, index: usize) -> Option<&MediaStatus> {
    index
      .checked_sub(self.offset)
      .and_then(|row| self.rows.get(row))
      .map(|slot| slot.status())
  }

  /// Change how many rows fit on screen.
  pub fn set_viewport<S: BlobSource>(&mut self, rows: usize, coordinator: &mut FetchCoordinator<S>) {
    let rows = rows.min(SLOTS_PER_LIST);
    if rows == self.rows.len() {
      return;
    }

    for row in rows..self.rows.len() {
      self.release_row(row, coordinator);
    }
    self.rows.resize_with(rows, MediaSlot::default);
    self.scroll_to_selection();
    self.rebind(coordinator);
  }

  pub fn move_selection<S: BlobSource>(
    &mut self,
    delta: isize,
    coordinator: &mut FetchCoordinator<S>,
  ) {
    if self.items.is_empty() {
      return;
    }
    let last = self.items.len() - 1;
    self.selected = self.selected.saturating_add_signed(delta).min(last);

    if self.scroll_to_selection() {
      self.rebind(coordinator);
    }
  }

  /// Request again every visible row whose fetch failed
  pub fn retry_failed<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) -> usize {
    let mut retried = 0;
    for row in 0..self.rows.len() {
      if self.rows[row].status() == &MediaStatus::Unavailable {
        if let Some(Some((id, url))) = self.items.get(self.offset + row) {
          coordinator.request(id, url, self.base + row, &mut self.rows[row]);
          retried += 1;
        }
      }
    }
    retried
  }

  /// Let go of every row, e.g. when the view closes
  pub fn release_all<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) {
    for row in 0..self.rows.len() {
      self.release_row(row, coordinator);
    }
  }

  /// Keep the selection inside the visible window. Returns whether the
  /// window moved.
  fn scroll_to_selection(&mut self) -> bool {
    let before = self.offset;
    let rows = self.rows.len().max(1);

    if self.selected < self.offset {
      self.offset = self.selected;
    } else if self.selected >= self.offset + rows {
      self.offset = self.selected + 1 - rows;
    }
    self.offset = self.offset.min(self.items.len().saturating_sub(rows));

    self.offset != before
  }

  /// Point every row at the item now under it.
  ///
  /// New items are requested before old ones are released, so an item that
  /// only moved to another row keeps its outstanding fetch.
  fn rebind<S: BlobSource>(&mut self, coordinator: &mut FetchCoordinator<S>) {
    let mut released = Vec::new();

    for row in 0..self.rows.len() {
      let target = self.items.get(self.offset + row).cloned().flatten();
      let current = self.rows[row].current_content_id().cloned();

      match target {
        Some((id, _)) if self.rows[row].shows(&id) => {}
        Some((id, url)) => {
          coordinator.request(&id, &url, self.base + row, &mut self.rows[row]);
          if let Some(old) = current.filter(|old| *old != id) {
            released.push((old, row));
          }
        }
        None => {
          if let Some(old) = current {
            self.rows[row].unbind();
            released.push((old, row));
          }
        }
      }
    }

    for (id, row) in released {
      coordinator.release(&id, self.base + row);
    }
  }

  fn release_row<S: BlobSource>(&mut self, row: usize, coordinator: &mut FetchCoordinator<S>) {
    let slot = &mut self.rows[row];
    if let Some(id) = slot.current_content_id().cloned() {
      coordinator.release(&id, self.base + row);
      slot.unbind();
    }
  }
}

impl SlotResolver for SlotList {
  type Slot = MediaSlot;

  fn resolve(&mut self, id: SlotId) -> Option<&mut MediaSlot> {
    id.checked_sub(self.base)
      .and_then(|row| self.rows.get_mut(row))
  }
}
