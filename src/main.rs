use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use mediafeed::app::App;
use mediafeed::config::Config;
use mediafeed::feed::Feed;
use mediafeed::logging;
use mediafeed::media::{FetchCoordinator, MediaCache, UrlBlobSource};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mediafeed")]
#[command(about = "A terminal timeline for photo, video and audio posts")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/mediafeed/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Feed file to show, overrides the config
  #[arg(short, long)]
  feed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _guard = logging::init(&config)?;

  let feed_path = args
    .feed
    .or_else(|| config.feed.clone())
    .ok_or_else(|| eyre!("No feed file given. Pass --feed or set `feed` in the config"))?;
  let feed = Feed::load(&feed_path)?;

  let source = UrlBlobSource::new(config.media.request_timeout())?;
  let cache = MediaCache::with_max_entries(config.media.cache_max_entries);
  let coordinator = FetchCoordinator::new(source, cache)
    .with_max_concurrent(config.media.max_concurrent_fetches)
    .with_subscriber_policy(config.media.subscriber_policy);

  tracing::info!(
    feed = %feed_path.display(),
    posts = feed.posts.len(),
    "Starting mediafeed"
  );

  let mut app = App::new(feed, coordinator);
  app.run().await?;

  Ok(())
}
