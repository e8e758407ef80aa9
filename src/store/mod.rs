pub mod sqlite;
pub mod state;

use crate::app::Result;

pub use sqlite::SqliteKv;
pub use state::StateStore;

/// Fixed keys for the four persisted records.
pub mod keys {
    pub const COLUMNS: &str = "subdeck_columns";
    pub const READ: &str = "subdeck_read";
    pub const CACHE: &str = "subdeck_cache";
    pub const ORDER: &str = "subdeck_order";
}

/// Durable string-keyed JSON document storage.
///
/// One key holds one document; there are no transactions across keys.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    /// Total stored size: key plus value length, summed over every entry.
    fn total_bytes(&self) -> Result<u64>;
}
