//! A single cancelable blob retrieval.

use bytes::Bytes;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use super::content_id::ContentId;
use super::error::FetchError;
use super::source::BlobSource;

/// Identifies one fetch task for the lifetime of a coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0)
  }
}

/// Lifecycle of a fetch task.
///
/// `Pending -> Running -> {Completed | Failed | Canceled}`. A task can also
/// be canceled while still waiting for a worker. Terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
  /// Created, waiting for a worker slot
  Pending,
  /// Network transfer in progress
  Running,
  /// Finished with a payload
  Completed,
  /// Finished without a payload
  Failed,
  /// Aborted before it could finish
  Canceled,
}

impl TaskState {
  pub fn is_terminal(&self) -> bool {
    matches!(
      self,
      TaskState::Completed | TaskState::Failed | TaskState::Canceled
    )
  }
}

/// What a finished task produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Fetched(Bytes),
  Failed(FetchError),
  Canceled,
}

impl FetchOutcome {
  /// The payload, present only on success.
  pub fn payload(&self) -> Option<&Bytes> {
    match self {
      FetchOutcome::Fetched(data) => Some(data),
      _ => None,
    }
  }
}

/// Completion signal posted by a worker once a task reaches a terminal state.
///
/// Sent for every task, including failed and canceled ones, so the owner can
/// always clean up its bookkeeping.
#[derive(Debug)]
pub struct TaskCompletion {
  pub task_id: TaskId,
  pub content_id: ContentId,
  pub outcome: FetchOutcome,
}

/// Handle to one asynchronous retrieval of `url` for `content_id`.
pub struct FetchTask {
  id: TaskId,
  content_id: ContentId,
  url: Url,
  cancel: CancellationToken,
  state: Arc<Mutex<TaskState>>,
}

impl FetchTask {
  pub fn new(id: TaskId, content_id: ContentId, url: Url) -> Self {
    Self {
      id,
      content_id,
      url,
      cancel: CancellationToken::new(),
      state: Arc::new(Mutex::new(TaskState::Pending)),
    }
  }

  pub fn id(&self) -> TaskId {
    self.id
  }

  pub fn content_id(&self) -> &ContentId {
    &self.content_id
  }

  pub fn url(&self) -> &Url {
    &self.url
  }

  pub fn state(&self) -> TaskState {
    *lock_state(&self.state)
  }

  pub fn is_finished(&self) -> bool {
    self.state().is_terminal()
  }

  /// Spawn the retrieval onto the runtime.
  ///
  /// The worker waits for a permit from `workers`, fetches from `source`, and
  /// always posts exactly one [`TaskCompletion`] on `completions`.
  pub fn start<S: BlobSource>(
    &self,
    source: Arc<S>,
    workers: Arc<Semaphore>,
    completions: mpsc::UnboundedSender<TaskCompletion>,
  ) -> JoinHandle<()> {
    let mut worker = Worker {
      task_id: self.id,
      content_id: self.content_id.clone(),
      url: self.url.clone(),
      cancel: self.cancel.clone(),
      state: Arc::clone(&self.state),
      completions,
      done: false,
    };

    tokio::spawn(async move {
      let result = tokio::select! {
        biased;
        _ = worker.cancel.cancelled() => None,
        result = run(source.as_ref(), &worker.url, &workers, &worker.state) => Some(result),
      };

      worker.complete(result);
    })
  }

  /// Request cancellation.
  ///
  /// Returns `false` when the task had already reached a terminal state, in
  /// which case nothing happens. A completion is still posted for a task
  /// canceled here, carrying [`FetchOutcome::Canceled`].
  pub fn cancel(&self) -> bool {
    let state = lock_state(&self.state);
    if state.is_terminal() {
      return false;
    }
    self.cancel.cancel();
    true
  }
}

impl fmt::Debug for FetchTask {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FetchTask")
      .field("id", &self.id)
      .field("content_id", &self.content_id)
      .field("url", &self.url.as_str())
      .field("state", &self.state())
      .finish()
  }
}

/// Owns the reporting side of a spawned fetch. If the worker unwinds before
/// reporting, dropping this posts a failure so the owner is never left waiting.
struct Worker {
  task_id: TaskId,
  content_id: ContentId,
  url: Url,
  cancel: CancellationToken,
  state: Arc<Mutex<TaskState>>,
  completions: mpsc::UnboundedSender<TaskCompletion>,
  done: bool,
}

impl Worker {
  fn complete(&mut self, result: Option<Result<Bytes, FetchError>>) {
    self.done = true;
    let task_id = self.task_id;
    let content_id = &self.content_id;

    let outcome = finish(&self.state, &self.cancel, result);
    match &outcome {
      FetchOutcome::Fetched(data) => {
        debug!(task = %task_id, content_id = %content_id, bytes = data.len(), "fetch completed")
      }
      FetchOutcome::Failed(e) => {
        warn!(task = %task_id, content_id = %content_id, url = %self.url, error = %e, "fetch failed")
      }
      FetchOutcome::Canceled => {
        debug!(task = %task_id, content_id = %content_id, "fetch canceled")
      }
    }

    // Ignore send errors - the coordinator may have been dropped
    let _ = self.completions.send(TaskCompletion {
      task_id,
      content_id: content_id.clone(),
      outcome,
    });
  }
}

impl Drop for Worker {
  fn drop(&mut self) {
    if !self.done {
      self.complete(Some(Err(FetchError::Transport(
        "fetch worker stopped before finishing".to_string(),
      ))));
    }
  }
}

async fn run<S: BlobSource>(
  source: &S,
  url: &Url,
  workers: &Semaphore,
  state: &Mutex<TaskState>,
) -> Result<Bytes, FetchError> {
  let _permit = workers
    .acquire()
    .await
    .map_err(|_| FetchError::Transport("worker pool closed".to_string()))?;

  {
    let mut state = lock_state(state);
    if *state == TaskState::Pending {
      *state = TaskState::Running;
    }
  }

  source.fetch(url).await
}

/// Move to a terminal state. Runs under the same lock as [`FetchTask::cancel`]
/// so a cancel either lands before this point or is rejected.
fn finish(
  state: &Mutex<TaskState>,
  cancel: &CancellationToken,
  result: Option<Result<Bytes, FetchError>>,
) -> FetchOutcome {
  let mut state = lock_state(state);

  let (next, outcome) = match result {
    _ if cancel.is_cancelled() => (TaskState::Canceled, FetchOutcome::Canceled),
    Some(Ok(data)) if data.is_empty() => (
      TaskState::Failed,
      FetchOutcome::Failed(FetchError::EmptyPayload),
    ),
    Some(Ok(data)) => (TaskState::Completed, FetchOutcome::Fetched(data)),
    Some(Err(e)) => (TaskState::Failed, FetchOutcome::Failed(e)),
    None => (TaskState::Canceled, FetchOutcome::Canceled),
  };

  *state = next;
  outcome
}

fn lock_state(state: &Mutex<TaskState>) -> MutexGuard<'_, TaskState> {
  state.lock().unwrap_or_else(PoisonError::into_inner)
}
