//! Terminal timeline viewer for a photo, video and audio feed.
//!
//! The [`media`] module holds the reusable part: a content-keyed payload
//! cache, cancelable fetch tasks, and the [`media::FetchCoordinator`] that
//! deduplicates fetches and drops results for display slots that moved on.

pub mod app;
pub mod config;
pub mod event;
pub mod feed;
pub mod logging;
pub mod media;
pub mod ui;
