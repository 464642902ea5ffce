use sha2::{Digest, Sha256};

use crate::media::{ContentId, Delivery, DisplaySlot, SlotBinding};

/// What a row currently shows in place of its media
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MediaStatus {
  /// Row has no media bound
  #[default]
  Empty,
  Loading,
  Ready {
    size: usize,
    /// Leading hex digits of the payload's SHA-256
    fingerprint: String,
  },
  /// Fetch failed, show a placeholder
  Unavailable,
}

/// A list row that displays fetched media.
///
/// Payloads are opaque here: the row shows size and fingerprint instead of
/// decoding them.
#[derive(Debug, Default)]
pub struct MediaSlot {
  binding: Option<SlotBinding>,
  status: MediaStatus,
}

impl MediaSlot {
  pub fn status(&self) -> &MediaStatus {
    &self.status
  }

  /// Bound to `id` and not showing a failure
  pub fn shows(&self, id: &ContentId) -> bool {
    self.current_content_id() == Some(id) && self.status != MediaStatus::Unavailable
  }
}

impl DisplaySlot for MediaSlot {
  fn binding(&self) -> Option<&SlotBinding> {
    self.binding.as_ref()
  }

  fn bind(&mut self, binding: SlotBinding) {
    self.binding = Some(binding);
    self.status = MediaStatus::Loading;
  }

  fn unbind(&mut self) {
    self.binding = None;
    self.status = MediaStatus::Empty;
  }

  fn receive(&mut self, delivery: Delivery) {
    self.status = match delivery {
      Delivery::Ready(data) => MediaStatus::Ready {
        size: data.len(),
        fingerprint: fingerprint(&data),
      },
      Delivery::Failed => MediaStatus::Unavailable,
    };
  }
}

fn fingerprint(data: &[u8]) -> String {
  let digest = Sha256::digest(data);
  hex::encode(&digest[..4])
}
