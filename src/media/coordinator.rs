//! Media-loading orchestration.
//!
//! The coordinator is the only thing display slots talk to. It answers from
//! the cache when it can, starts at most one fetch per content id, and routes
//! each finished fetch only to slots still bound to the request that asked
//! for it.
//!
//! Workers never touch slots. They post a [`TaskCompletion`] on a channel,
//! and the owner of the coordinator drains it from the UI loop:
//!
//! ```ignore
//! let outcome = coordinator.request(&id, &url, slot_id, &mut slots[slot_id]);
//!
//! // On each tick
//! if coordinator.poll(&mut slots) {
//!     // Some slot may have new media, redraw
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tracing::debug;
use url::Url;

use super::cache::MediaCache;
use super::content_id::ContentId;
use super::slot::{Delivery, DisplaySlot, SlotBinding, SlotId, SlotResolver, Ticket};
use super::source::BlobSource;
use super::task::{FetchOutcome, FetchTask, TaskCompletion, TaskId, TaskState};

/// Default number of fetches allowed on the wire at once.
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Who gets notified when several slots ask for the same uncached content
/// while its fetch is in flight.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SubscriberPolicy {
  /// Every requesting slot that is still bound gets the result
  #[default]
  All,
  /// Only the most recent requester is tracked; earlier ones are dropped
  LatestOnly,
}

/// How a request was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
  /// Payload was cached and has already been delivered
  Hit,
  /// A new fetch task was started
  Started(TaskId),
  /// A fetch for this content was already in flight
  Joined(TaskId),
}

/// Summary of one applied completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionReport {
  pub task_id: TaskId,
  pub content_id: ContentId,
  /// Terminal state the task ended in
  pub state: TaskState,
  /// Slots that received the result
  pub delivered: usize,
  /// Subscribers skipped because their slot was rebound
  pub stale: usize,
}

/// Running counters, mostly for logging and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
  pub cache_hits: u64,
  pub started: u64,
  pub joined: u64,
  pub completed: u64,
  pub failed: u64,
  pub canceled: u64,
  pub stale_suppressed: u64,
}

#[derive(Debug, Clone, Copy)]
struct Subscriber {
  slot: SlotId,
  ticket: Ticket,
}

struct InFlight {
  task: FetchTask,
  subscribers: Vec<Subscriber>,
  /// Cancellation was accepted by the task; its result will be discarded
  canceled: bool,
}

/// Deduplicating, cancel-aware media loader.
///
/// Owns the in-flight registry outright. All registry and cache writes happen
/// inside `&mut self` methods, which the host calls from its UI context.
pub struct FetchCoordinator<S: BlobSource> {
  source: Arc<S>,
  cache: MediaCache,
  workers: Arc<Semaphore>,
  policy: SubscriberPolicy,
  in_flight: HashMap<ContentId, InFlight>,
  completions_tx: mpsc::UnboundedSender<TaskCompletion>,
  completions_rx: mpsc::UnboundedReceiver<TaskCompletion>,
  next_ticket: u64,
  next_task: u64,
  stats: FetchStats,
}

impl<S: BlobSource> FetchCoordinator<S> {
  pub fn new(source: S, cache: MediaCache) -> Self {
    let (completions_tx, completions_rx) = mpsc::unbounded_channel();

    Self {
      source: Arc::new(source),
      cache,
      workers: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT)),
      policy: SubscriberPolicy::default(),
      in_flight: HashMap::new(),
      completions_tx,
      completions_rx,
      next_ticket: 0,
      next_task: 0,
      stats: FetchStats::default(),
    }
  }

  /// Limit how many fetches run at once. Extra tasks wait in `Pending`.
  pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
    self.workers = Arc::new(Semaphore::new(max_concurrent.max(1)));
    self
  }

  pub fn with_subscriber_policy(mut self, policy: SubscriberPolicy) -> Self {
    self.policy = policy;
    self
  }

  pub fn cache(&self) -> &MediaCache {
    &self.cache
  }

  pub fn stats(&self) -> FetchStats {
    self.stats
  }

  pub fn is_in_flight(&self, content_id: &ContentId) -> bool {
    self.in_flight.contains_key(content_id)
  }

  pub fn in_flight_len(&self) -> usize {
    self.in_flight.len()
  }

  /// State of the task currently registered for `content_id`.
  pub fn task_state(&self, content_id: &ContentId) -> Option<TaskState> {
    self.in_flight.get(content_id).map(|e| e.task.state())
  }

  /// Ask for the media behind `content_id` on behalf of `slot`.
  ///
  /// The slot is rebound to a fresh ticket first, which makes every earlier
  /// pending delivery to it stale. A cache hit is delivered before this
  /// returns; otherwise the payload arrives through a later [`poll`].
  ///
  /// [`poll`]: FetchCoordinator::poll
  pub fn request<D>(
    &mut self,
    content_id: &ContentId,
    url: &Url,
    slot_id: SlotId,
    slot: &mut D,
  ) -> RequestOutcome
  where
    D: DisplaySlot + ?Sized,
  {
    let ticket = self.mint_ticket();
    slot.bind(SlotBinding {
      content_id: content_id.clone(),
      ticket,
    });

    if let Some(data) = self.cache.value(content_id) {
      self.stats.cache_hits += 1;
      slot.receive(Delivery::Ready(data));
      return RequestOutcome::Hit;
    }

    let subscriber = Subscriber {
      slot: slot_id,
      ticket,
    };

    if let Some(entry) = self.in_flight.get_mut(content_id) {
      if !entry.canceled {
        match self.policy {
          SubscriberPolicy::All => entry.subscribers.retain(|s| s.slot != slot_id),
          SubscriberPolicy::LatestOnly => entry.subscribers.clear(),
        }
        entry.subscribers.push(subscriber);
        self.stats.joined += 1;
        debug!(content_id = %content_id, task = %entry.task.id(), slot = slot_id, "joined in-flight fetch");
        return RequestOutcome::Joined(entry.task.id());
      }
      // A canceled task is on its way out. Replace it; its completion will
      // no longer match the registry and is discarded.
    }

    let task_id = self.start_task(content_id, url, subscriber);
    RequestOutcome::Started(task_id)
  }

  /// Cancel the fetch for `content_id`.
  ///
  /// Returns `false` for unknown ids and for tasks that already finished. A
  /// canceled task writes nothing to the cache and delivers nothing.
  pub fn cancel(&mut self, content_id: &ContentId) -> bool {
    match self.in_flight.get_mut(content_id) {
      Some(entry) if !entry.canceled => {
        if entry.task.cancel() {
          entry.canceled = true;
          debug!(content_id = %content_id, task = %entry.task.id(), "canceled fetch");
          true
        } else {
          false
        }
      }
      _ => false,
    }
  }

  /// Withdraw `slot_id`'s interest in `content_id`, canceling the fetch once
  /// nobody else is waiting for it. Returns whether the fetch was canceled.
  pub fn release(&mut self, content_id: &ContentId, slot_id: SlotId) -> bool {
    let Some(entry) = self.in_flight.get_mut(content_id) else {
      return false;
    };

    entry.subscribers.retain(|s| s.slot != slot_id);
    if entry.subscribers.is_empty() {
      self.cancel(content_id)
    } else {
      false
    }
  }

  /// Cancel every in-flight fetch. Returns how many were canceled.
  pub fn cancel_all(&mut self) -> usize {
    let ids: Vec<ContentId> = self.in_flight.keys().cloned().collect();
    ids.iter().filter(|id| self.cancel(id)).count()
  }

  /// Apply every completion that has arrived, without waiting.
  ///
  /// Returns `true` if anything was applied. Call this from the UI loop tick.
  pub fn poll<R>(&mut self, slots: &mut R) -> bool
  where
    R: SlotResolver + ?Sized,
  {
    let mut changed = false;
    while let Ok(completion) = self.completions_rx.try_recv() {
      self.apply(completion, slots);
      changed = true;
    }
    changed
  }

  /// Wait for the next completion and apply it.
  ///
  /// Returns `None` right away when nothing is in flight.
  pub async fn next_completion<R>(&mut self, slots: &mut R) -> Option<CompletionReport>
  where
    R: SlotResolver + ?Sized,
  {
    if self.in_flight.is_empty() {
      return None;
    }
    let completion = self.completions_rx.recv().await?;
    Some(self.apply(completion, slots))
  }

  /// Apply completions until the in-flight registry is empty.
  pub async fn settle<R>(&mut self, slots: &mut R) -> Vec<CompletionReport>
  where
    R: SlotResolver + ?Sized,
  {
    let mut reports = Vec::new();
    while let Some(report) = self.next_completion(slots).await {
      reports.push(report);
    }
    reports
  }

  fn start_task(&mut self, content_id: &ContentId, url: &Url, subscriber: Subscriber) -> TaskId {
    self.next_task += 1;
    let task = FetchTask::new(TaskId(self.next_task), content_id.clone(), url.clone());
    let task_id = task.id();

    task.start(
      Arc::clone(&self.source),
      Arc::clone(&self.workers),
      self.completions_tx.clone(),
    );
    self.stats.started += 1;
    debug!(content_id = %content_id, task = %task_id, url = %url, "started fetch");

    self.in_flight.insert(
      content_id.clone(),
      InFlight {
        task,
        subscribers: vec![subscriber],
        canceled: false,
      },
    );

    task_id
  }

  fn apply<R>(&mut self, completion: TaskCompletion, slots: &mut R) -> CompletionReport
  where
    R: SlotResolver + ?Sized,
  {
    let TaskCompletion {
      task_id,
      content_id,
      outcome,
    } = completion;

    // Registry cleanup happens no matter what the outcome is
    let registered = self
      .in_flight
      .get(&content_id)
      .is_some_and(|e| e.task.id() == task_id);
    let subscribers = if registered {
      self
        .in_flight
        .remove(&content_id)
        .map(|e| e.subscribers)
        .unwrap_or_default()
    } else {
      Vec::new()
    };

    let (state, delivery) = match outcome {
      FetchOutcome::Fetched(data) => {
        self.cache.store(data.clone(), &content_id);
        self.stats.completed += 1;
        (TaskState::Completed, Some(Delivery::Ready(data)))
      }
      FetchOutcome::Failed(_) => {
        self.stats.failed += 1;
        (TaskState::Failed, Some(Delivery::Failed))
      }
      FetchOutcome::Canceled => {
        self.stats.canceled += 1;
        (TaskState::Canceled, None)
      }
    };

    let mut delivered = 0;
    let mut stale = 0;
    if let Some(delivery) = delivery {
      for subscriber in subscribers {
        match slots.resolve(subscriber.slot) {
          Some(slot) if slot.accepts(&content_id, subscriber.ticket) => {
            slot.receive(delivery.clone());
            delivered += 1;
          }
          _ => {
            stale += 1;
            debug!(content_id = %content_id, slot = subscriber.slot, "suppressed stale delivery");
          }
        }
      }
    }
    self.stats.stale_suppressed += stale as u64;

    CompletionReport {
      task_id,
      content_id,
      state,
      delivered,
      stale,
    }
  }

  fn mint_ticket(&mut self) -> Ticket {
    self.next_ticket += 1;
    Ticket(self.next_ticket)
  }
}

impl<S: BlobSource> std::fmt::Debug for FetchCoordinator<S> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("FetchCoordinator")
      .field("in_flight", &self.in_flight.len())
      .field("policy", &self.policy)
      .field("cache", &self.cache)
      .field("stats", &self.stats)
      .finish_non_exhaustive()
  }
}
