use chrono::{DateTime, Utc};
use std::fmt;

/// Opaque, stable identifier for a piece of fetchable media.
///
/// This is the only key used by the cache and the in-flight registry, so two
/// items must never share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(String);

impl ContentId {
  pub fn new(id: impl Into<String>) -> Self {
    Self(id.into())
  }

  /// Media attached to a post.
  pub fn for_post(post_id: &str) -> Self {
    Self(format!("post:{}", post_id))
  }

  /// Audio attached to a comment. Comments have no id of their own, so the
  /// author and creation time together identify them.
  pub fn for_comment(author_uid: &str, timestamp: DateTime<Utc>) -> Self {
    Self(format!(
      "comment:{}:{}",
      author_uid,
      timestamp.timestamp_millis()
    ))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for ContentId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for ContentId {
  fn from(s: &str) -> Self {
    Self::new(s)
  }
}

impl From<String> for ContentId {
  fn from(s: String) -> Self {
    Self(s)
  }
}
