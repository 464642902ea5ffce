//! Media loading: payload cache, cancelable fetch tasks, and the coordinator
//! that ties them to reusable display slots.
//!
//! - At most one fetch per content id is in flight at a time
//! - Finished fetches are cached, then delivered only to slots still bound
//!   to the request that asked for them
//! - Canceled fetches write nothing and deliver nothing

mod cache;
mod content_id;
mod coordinator;
mod error;
mod slot;
mod source;
mod task;

#[cfg(test)]
pub mod testing;

pub use cache::MediaCache;
pub use content_id::ContentId;
pub use coordinator::{
  CompletionReport, FetchCoordinator, FetchStats, RequestOutcome, SubscriberPolicy,
  DEFAULT_MAX_CONCURRENT,
};
pub use error::FetchError;
pub use slot::{Delivery, DisplaySlot, SlotBinding, SlotId, SlotResolver, Ticket};
pub use source::{BlobSource, UrlBlobSource};
pub use task::{FetchOutcome, FetchTask, TaskCompletion, TaskId, TaskState};
