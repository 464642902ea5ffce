//! Timeline data: posts, their comments, and loading them from a feed file.

mod loader;
mod types;

pub use types::{Author, Comment, Feed, Geotag, MediaType, Post};
