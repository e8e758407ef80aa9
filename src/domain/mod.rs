pub mod column;
pub mod item;

pub use column::{Column, Sort, Timeframe};
pub use item::{cache_key, CacheEntry, Item};
