pub mod http_fetcher;
pub mod service;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::{Item, Sort, Timeframe};

pub use http_fetcher::HttpFetcher;
pub use service::FeedService;

/// Page size requested from the listing endpoint.
pub const PAGE_LIMIT: u32 = 20;

pub(crate) const REDDIT_BASE: &str = "https://www.reddit.com";

/// Listing endpoint for a subreddit. The timeframe parameter is appended
/// only for sorts that accept one.
pub fn build_reddit_url(subreddit: &str, sort: Sort, timeframe: Option<Timeframe>) -> String {
    let mut url = format!(
        "{}/r/{}/{}.json?limit={}",
        REDDIT_BASE,
        subreddit,
        sort.as_str(),
        PAGE_LIMIT
    );
    if sort.takes_timeframe() {
        if let Some(tf) = timeframe {
            url.push_str("&t=");
            url.push_str(tf.as_str());
        }
    }
    url
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches one page of posts for a subreddit listing.
    async fn fetch_listing(
        &self,
        subreddit: &str,
        sort: Sort,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<Item>>;
}
