//! Remote blob retrieval.

use bytes::Bytes;
use color_eyre::{eyre::eyre, Result};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use super::error::FetchError;

/// Something that can turn a URL into raw bytes.
///
/// One call per uncached content id. Retries, redirects and partial content
/// belong to the implementation, not to callers.
pub trait BlobSource: Send + Sync + 'static {
  fn fetch(&self, url: &Url) -> impl Future<Output = Result<Bytes, FetchError>> + Send;
}

impl<T: BlobSource> BlobSource for Arc<T> {
  fn fetch(&self, url: &Url) -> impl Future<Output = Result<Bytes, FetchError>> + Send {
    (**self).fetch(url)
  }
}

/// Fetches `http(s)://` URLs over the network and `file://` URLs from disk.
#[derive(Clone)]
pub struct UrlBlobSource {
  client: Client,
}

impl UrlBlobSource {
  pub fn new(timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .pool_max_idle_per_host(10)
      .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { client })
  }

  async fn fetch_http(&self, url: &Url) -> Result<Bytes, FetchError> {
    let response = self.client.get(url.clone()).send().await?;

    let status = response.status();
    if !status.is_success() {
      return Err(FetchError::Status(status.as_u16()));
    }

    Ok(response.bytes().await?)
  }

  async fn fetch_file(url: &Url) -> Result<Bytes, FetchError> {
    let path = url
      .to_file_path()
      .map_err(|_| FetchError::UnsupportedScheme(url.to_string()))?;

    let data = tokio::fs::read(&path).await.map_err(|e| FetchError::Io {
      path: path.display().to_string(),
      message: e.to_string(),
    })?;

    Ok(Bytes::from(data))
  }
}

impl BlobSource for UrlBlobSource {
  async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
    let data = match url.scheme() {
      "http" | "https" => self.fetch_http(url).await?,
      "file" => Self::fetch_file(url).await?,
      other => return Err(FetchError::UnsupportedScheme(other.to_string())),
    };

    if data.is_empty() {
      return Err(FetchError::EmptyPayload);
    }

    Ok(data)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[tokio::test]
  async fn test_reads_file_urls() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&[0xFF, 0xD8, 0xFF]).unwrap();
    let url = Url::from_file_path(file.path()).unwrap();

    let source = UrlBlobSource::new(Duration::from_secs(1)).unwrap();
    let data = source.fetch(&url).await.unwrap();

    assert_eq!(data.as_ref(), &[0xFF, 0xD8, 0xFF]);
  }

  #[tokio::test]
  async fn test_empty_file_is_a_failure() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let url = Url::from_file_path(file.path()).unwrap();

    let source = UrlBlobSource::new(Duration::from_secs(1)).unwrap();
    assert_eq!(source.fetch(&url).await, Err(FetchError::EmptyPayload));
  }

  #[tokio::test]
  async fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = Url::from_file_path(dir.path().join("missing.jpg")).unwrap();

    let source = UrlBlobSource::new(Duration::from_secs(1)).unwrap();
    assert!(matches!(
      source.fetch(&url).await,
      Err(FetchError::Io { .. })
    ));
  }

  #[tokio::test]
  async fn test_rejects_unknown_scheme() {
    let url = Url::parse("ftp://example.com/a.jpg").unwrap();
    let source = UrlBlobSource::new(Duration::from_secs(1)).unwrap();
    assert_eq!(
      source.fetch(&url).await,
      Err(FetchError::UnsupportedScheme("ftp".to_string()))
    );
  }
}
