pub mod commands;

use clap::{Parser, Subcommand};

use crate::fetcher::service::DEFAULT_WORKERS;

#[derive(Parser)]
#[command(name = "subdeck")]
#[command(about = "A subreddit start page for the terminal", long_about = None)]
pub struct Cli {
    /// Number of parallel workers when refreshing every column
    #[arg(short, long, default_value_t = DEFAULT_WORKERS, global = true)]
    pub workers: usize,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Add a subreddit column
    Add {
        /// Subreddit name, without the r/ prefix
        subreddit: String,
        /// Listing sort: hot, new, rising, top, controversial
        #[arg(short, long, default_value = "hot")]
        sort: String,
        /// Timeframe for top/controversial: hour, day, week, month, year, all
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Remove a column
    Remove {
        /// Column id (see `list`)
        id: String,
    },
    /// List columns in display order with unread counts
    List,
    /// Show a column's unread items
    Show {
        id: String,
        /// Bypass the cache freshness window
        #[arg(long)]
        force: bool,
    },
    /// Change a column's sort (and optionally its timeframe)
    Sort {
        id: String,
        /// New sort: hot, new, rising, top, controversial
        sort: String,
        #[arg(short, long)]
        timeframe: Option<String>,
    },
    /// Mark a single item or a whole column as read
    MarkRead {
        id: String,
        /// Mark only this item id instead of the whole column
        #[arg(long)]
        item: Option<String>,
    },
    /// Move a column to a new position (0-based)
    Move { id: String, position: usize },
    /// Force-refresh one column, or every column
    Refresh { id: Option<String> },
    /// Show storage usage against the quota
    Usage,
}
