use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::app::{Result, SubdeckError};
use crate::domain::{Item, Sort, Timeframe};
use crate::fetcher::{build_reddit_url, Fetcher, REDDIT_BASE};

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<ListingChild>,
}

#[derive(Debug, Deserialize)]
struct ListingChild {
    data: RawPost,
}

/// The handful of post fields the start page displays. Any of them may be
/// missing upstream.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawPost {
    name: Option<String>,
    title: Option<String>,
    score: Option<i64>,
    thumbnail: Option<String>,
    permalink: Option<String>,
    created_utc: Option<f64>,
}

impl From<RawPost> for Item {
    fn from(post: RawPost) -> Self {
        Self {
            id: post.name.unwrap_or_default(),
            title: post.title.unwrap_or_default(),
            score: post.score.unwrap_or_default(),
            thumbnail: post.thumbnail,
            url: format!("{}{}", REDDIT_BASE, post.permalink.unwrap_or_default()),
            created: post.created_utc.unwrap_or_default() as i64,
        }
    }
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .brotli(true)
            .user_agent(user_agent)
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new("subdeck/0.1.0", Duration::from_secs(10))
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_listing(
        &self,
        subreddit: &str,
        sort: Sort,
        timeframe: Option<Timeframe>,
    ) -> Result<Vec<Item>> {
        let url = build_reddit_url(subreddit, sort, timeframe);
        debug!(%url, "requesting listing");

        let response =
            self.client
                .get(&url)
                .send()
                .await
                .map_err(|e| SubdeckError::Fetch {
                    subreddit: subreddit.to_string(),
                    reason: e.to_string(),
                })?;

        if !response.status().is_success() {
            return Err(SubdeckError::Fetch {
                subreddit: subreddit.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let listing: Listing = response.json().await.map_err(|e| SubdeckError::Fetch {
            subreddit: subreddit.to_string(),
            reason: format!("invalid listing payload: {}", e),
        })?;

        Ok(listing
            .data
            .children
            .into_iter()
            .map(|child| child.data.into())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_maps_to_items() {
        let payload = r#"{
            "kind": "Listing",
            "data": {
                "children": [
                    {
                        "kind": "t3",
                        "data": {
                            "name": "t3_abc",
                            "title": "First post",
                            "score": 42,
                            "thumbnail": "https://b.thumbs.example/a.jpg",
                            "permalink": "/r/rust/comments/abc/first_post/",
                            "created_utc": 1700000000.0,
                            "author": "someone",
                            "num_comments": 7
                        }
                    }
                ]
            }
        }"#;

        let listing: Listing = serde_json::from_str(payload).unwrap();
        let items: Vec<Item> = listing
            .data
            .children
            .into_iter()
            .map(|c| c.data.into())
            .collect();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "t3_abc");
        assert_eq!(items[0].score, 42);
        assert_eq!(
            items[0].url,
            "https://www.reddit.com/r/rust/comments/abc/first_post/"
        );
        assert_eq!(items[0].created, 1_700_000_000);
    }

    #[test]
    fn test_missing_post_fields_tolerated() {
        let payload = r#"{"data":{"children":[{"kind":"t3","data":{"title":"bare"}}]}}"#;

        let listing: Listing = serde_json::from_str(payload).unwrap();
        let item: Item = listing.data.children.into_iter().next().unwrap().data.into();

        assert_eq!(item.id, "");
        assert_eq!(item.title, "bare");
        assert_eq!(item.score, 0);
        assert!(item.thumbnail.is_none());
        assert_eq!(item.created, 0);
    }

    #[test]
    fn test_empty_listing() {
        let payload = r#"{"data":{}}"#;
        let listing: Listing = serde_json::from_str(payload).unwrap();
        assert!(listing.data.children.is_empty());
    }
}
