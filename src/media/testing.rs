//! Test doubles for the media pipeline.

use bytes::Bytes;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use url::Url;

use super::content_id::ContentId;
use super::error::FetchError;
use super::slot::{Delivery, DisplaySlot, SlotBinding};
use super::source::BlobSource;

/// Scripted blob source. URLs can be gated so their fetch blocks until
/// [`FakeSource::release`] is called.
#[derive(Default)]
pub struct FakeSource {
  responses: Mutex<HashMap<String, Result<Bytes, FetchError>>>,
  gates: Mutex<HashMap<String, Arc<Semaphore>>>,
  calls: Mutex<HashMap<String, usize>>,
}

impl FakeSource {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn respond(&self, url: &str, data: &[u8]) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(url.to_string(), Ok(Bytes::copy_from_slice(data)));
  }

  pub fn fail(&self, url: &str, error: FetchError) {
    self
      .responses
      .lock()
      .unwrap()
      .insert(url.to_string(), Err(error));
  }

  /// Hold fetches of `url` until released.
  pub fn gate(&self, url: &str) {
    self
      .gates
      .lock()
      .unwrap()
      .insert(url.to_string(), Arc::new(Semaphore::new(0)));
  }

  /// Let one pending fetch of `url` through.
  pub fn release(&self, url: &str) {
    if let Some(gate) = self.gates.lock().unwrap().get(url) {
      gate.add_permits(1);
    }
  }

  pub fn calls(&self, url: &str) -> usize {
    self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
  }
}

impl BlobSource for FakeSource {
  async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
    let key = url.to_string();
    let gate = {
      *self.calls.lock().unwrap().entry(key.clone()).or_default() += 1;
      self.gates.lock().unwrap().get(&key).cloned()
    };

    if let Some(gate) = gate {
      gate
        .acquire()
        .await
        .map_err(|_| FetchError::Transport("gate closed".to_string()))?
        .forget();
    }

    let response = self.responses.lock().unwrap().get(&key).cloned();
    response.unwrap_or_else(|| Err(FetchError::Transport(format!("no response for {}", key))))
  }
}

/// Display slot that records everything delivered to it.
#[derive(Debug, Default)]
pub struct RecordingSlot {
  pub binding: Option<SlotBinding>,
  pub received: Vec<(ContentId, Delivery)>,
}

impl RecordingSlot {
  pub fn payloads(&self) -> Vec<Bytes> {
    self
      .received
      .iter()
      .filter_map(|(_, delivery)| match delivery {
        Delivery::Ready(data) => Some(data.clone()),
        Delivery::Failed => None,
      })
      .collect()
  }
}

impl DisplaySlot for RecordingSlot {
  fn binding(&self) -> Option<&SlotBinding> {
    self.binding.as_ref()
  }

  fn bind(&mut self, binding: SlotBinding) {
    self.binding = Some(binding);
  }

  fn unbind(&mut self) {
    self.binding = None;
  }

  fn receive(&mut self, delivery: Delivery) {
    let id = self
      .binding
      .as_ref()
      .map(|b| b.content_id.clone())
      .unwrap_or_else(|| ContentId::new(""));
    self.received.push((id, delivery));
  }
}

pub fn url(s: &str) -> Url {
  Url::parse(s).unwrap()
}
