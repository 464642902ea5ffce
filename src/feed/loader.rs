use color_eyre::{eyre::eyre, Result};
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use super::types::Feed;

impl Feed {
  /// Load a feed from a YAML file.
  ///
  /// Posts are sorted newest first. Post ids and audio comment ids must be
  /// unique since they key the media cache.
  pub fn load(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read feed file {}: {}", path.display(), e))?;

    let feed = Self::parse(&contents)
      .map_err(|e| eyre!("Failed to load feed file {}: {}", path.display(), e))?;

    info!(path = %path.display(), posts = feed.posts.len(), "loaded feed");
    Ok(feed)
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let mut feed: Feed = serde_yaml::from_str(contents)?;
    feed.validate()?;
    feed.posts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(feed)
  }

  fn validate(&self) -> Result<()> {
    let mut seen = HashSet::new();

    for post in &self.posts {
      if !seen.insert(post.content_id()) {
        return Err(eyre!("Duplicate post id: {}", post.id));
      }
      for comment in &post.comments {
        if comment.text.is_none() && comment.audio_url.is_none() {
          return Err(eyre!(
            "Comment by {} on post {} has neither text nor audio",
            comment.author.uid,
            post.id
          ));
        }
        if let Some((id, _)) = comment.audio() {
          if !seen.insert(id.clone()) {
            return Err(eyre!("Duplicate audio comment id: {}", id));
          }
        }
      }
    }

    Ok(())
  }
}
