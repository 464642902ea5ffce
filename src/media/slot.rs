//! The contract between the coordinator and the visual elements it feeds.

use bytes::Bytes;
use std::collections::HashMap;

use super::content_id::ContentId;

/// Index of a display slot in whatever collection the host keeps them in.
pub type SlotId = usize;

/// Validity token minted per request. A completion may only be delivered to
/// a slot whose current binding still carries the same ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub(crate) u64);

/// What a slot is currently showing, and which request put it there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotBinding {
  pub content_id: ContentId,
  pub ticket: Ticket,
}

/// Result handed to a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
  /// Raw payload, decoded by the slot
  Ready(Bytes),
  /// The fetch failed; show a placeholder
  Failed,
}

/// A reusable visual element (list row, grid cell) that can be rebound to
/// different content over its lifetime.
pub trait DisplaySlot {
  fn binding(&self) -> Option<&SlotBinding>;

  /// Replace the current binding. Called by the coordinator on every request.
  fn bind(&mut self, binding: SlotBinding);

  /// Drop the current binding, e.g. when the slot scrolls onto content with
  /// no media. Pending completions for the old binding become stale.
  fn unbind(&mut self);

  fn receive(&mut self, delivery: Delivery);

  fn current_content_id(&self) -> Option<&ContentId> {
    self.binding().map(|b| &b.content_id)
  }

  /// Whether a completion minted with `ticket` for `content_id` still applies.
  fn accepts(&self, content_id: &ContentId, ticket: Ticket) -> bool {
    self
      .binding()
      .is_some_and(|b| b.ticket == ticket && &b.content_id == content_id)
  }
}

/// Lookup from [`SlotId`] to a live slot.
pub trait SlotResolver {
  type Slot: DisplaySlot;

  fn resolve(&mut self, id: SlotId) -> Option<&mut Self::Slot>;
}

impl<S: DisplaySlot> SlotResolver for [S] {
  type Slot = S;

  fn resolve(&mut self, id: SlotId) -> Option<&mut S> {
    self.get_mut(id)
  }
}

impl<S: DisplaySlot> SlotResolver for Vec<S> {
  type Slot = S;

  fn resolve(&mut self, id: SlotId) -> Option<&mut S> {
    self.get_mut(id)
  }
}

impl<S: DisplaySlot> SlotResolver for HashMap<SlotId, S> {
  type Slot = S;

  fn resolve(&mut self, id: SlotId) -> Option<&mut S> {
    self.get_mut(&id)
  }
}
