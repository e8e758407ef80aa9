//! # Subdeck
//!
//! A personal subreddit start page for the terminal: subreddit listings as
//! ordered columns, with a two-hour client-side cache, read tracking, and a
//! storage-usage watchdog.
//!
//! ## Architecture
//!
//! ```text
//! Fetcher → FeedService → StateStore → KvStore
//! ```
//!
//! - [`fetcher`]: listing HTTP client and the cache-first
//!   [`FeedService`](fetcher::FeedService)
//! - [`store`]: key-value persistence plus the typed
//!   [`StateStore`](store::StateStore) over the four records (columns,
//!   read set, cache, order)
//! - [`domain`]: [`Column`](domain::Column), [`Item`](domain::Item) and
//!   cache types
//! - [`cli`]: clap commands mirroring the start-page actions

/// Application context and error handling.
///
/// [`AppContext`](app::AppContext) wires together store and fetcher.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration loaded from `~/.config/subdeck/config.toml`.
pub mod config;

/// Core domain models.
pub mod domain;

/// Listing fetching and the cache policy around it.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for listing fetching
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`FeedService`](fetcher::FeedService): cache-first access with
///   per-key sequencing and a bounded parallel refresh
pub mod fetcher;

/// Persistence layer.
///
/// - [`KvStore`](store::KvStore): string-keyed JSON document storage
/// - [`SqliteKv`](store::SqliteKv): SQLite implementation
/// - [`StateStore`](store::StateStore): typed record accessors and the
///   storage quota watchdog
pub mod store;
