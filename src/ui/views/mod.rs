pub mod detail;
pub mod feed;

pub use detail::DetailView;
pub use feed::FeedView;
