use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::app::error::{Result, SubdeckError};
use crate::config::Config;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::{FeedService, Fetcher};
use crate::store::{SqliteKv, StateStore};

pub struct AppContext {
    pub store: Arc<StateStore<SqliteKv>>,
    pub feeds: Arc<FeedService<SqliteKv>>,
}

impl AppContext {
    pub fn new(config: &Config) -> Result<Self> {
        let db_path = match &config.db_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(StateStore::new(SqliteKv::new(&db_path)?)?);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(
            &config.user_agent,
            Duration::from_secs(config.timeout_secs),
        ));
        let feeds = Arc::new(FeedService::new(store.clone(), fetcher));

        Ok(Self { store, feeds })
    }

    pub fn in_memory() -> Result<Self> {
        let store = Arc::new(StateStore::new(SqliteKv::in_memory()?)?);
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::default());
        let feeds = Arc::new(FeedService::new(store.clone(), fetcher));

        Ok(Self { store, feeds })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| SubdeckError::Config("Could not find data directory".into()))?;
        let subdeck_dir = data_dir.join("subdeck");
        std::fs::create_dir_all(&subdeck_dir)?;
        Ok(subdeck_dir.join("subdeck.db"))
    }
}
