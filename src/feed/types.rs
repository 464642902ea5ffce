use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use url::Url;

use crate::media::ContentId;

/// Who posted or commented
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Author {
  pub uid: String,
  pub display_name: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
  Image,
  Video,
  Audio,
}

impl fmt::Display for MediaType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MediaType::Image => f.write_str("image"),
      MediaType::Video => f.write_str("video"),
      MediaType::Audio => f.write_str("audio"),
    }
  }
}

/// Where a post was made
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Geotag {
  pub latitude: f64,
  pub longitude: f64,
}

impl fmt::Display for Geotag {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
  }
}

/// A text or audio reply to a post
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
  pub author: Author,
  pub timestamp: DateTime<Utc>,
  pub text: Option<String>,
  pub audio_url: Option<Url>,
}

impl Comment {
  pub fn content_id(&self) -> ContentId {
    ContentId::for_comment(&self.author.uid, self.timestamp)
  }

  /// Id and URL of the audio clip, if this is an audio comment
  pub fn audio(&self) -> Option<(ContentId, &Url)> {
    self.audio_url.as_ref().map(|url| (self.content_id(), url))
  }
}

/// A timeline entry with one piece of media
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
  pub id: String,
  pub title: Option<String>,
  pub author: Author,
  pub timestamp: DateTime<Utc>,
  pub media_type: MediaType,
  pub media_url: Url,
  /// Height / width of the media, when known
  pub ratio: Option<f64>,
  pub geotag: Option<Geotag>,
  #[serde(default)]
  pub comments: Vec<Comment>,
}

impl Post {
  pub fn content_id(&self) -> ContentId {
    ContentId::for_post(&self.id)
  }

  /// Explicit title, falling back to the first comment's text
  pub fn title(&self) -> &str {
    self
      .title
      .as_deref()
      .or_else(|| self.comments.first().and_then(|c| c.text.as_deref()))
      .unwrap_or("")
  }
}

/// All posts, newest first once loaded
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Feed {
  #[serde(default)]
  pub posts: Vec<Post>,
}
