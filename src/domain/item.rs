use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::column::{Sort, Timeframe};

/// One post from a subreddit listing. Exactly the six fields the start page
/// displays; everything else in the upstream payload is discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    pub url: String,
    /// Unix timestamp in seconds, as reported by the listing endpoint.
    pub created: i64,
}

/// A cached listing page. Fresh while `cached_at` is within the cache
/// duration; readers that tolerate staleness may still use the items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub items: Vec<Item>,
    pub cached_at: DateTime<Utc>,
}

/// Cache key for a listing address. An absent timeframe is spelled `none`
/// so the key stays deterministic.
pub fn cache_key(subreddit: &str, sort: Sort, timeframe: Option<Timeframe>) -> String {
    format!(
        "{}_{}_{}",
        subreddit,
        sort.as_str(),
        timeframe.map(|t| t.as_str()).unwrap_or("none")
    )
}
