use rusqlite::{params, Connection, OptionalExtension, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::catalog::{EpisodeFilter, EpisodeRecord, MovieCandidate, MovieCatalog, Series, TvCatalog};
use crate::error::CatalogError;

/// SQLite store of catalog responses keyed by endpoint and query.
pub struct MediaCache {
    conn: Connection,
}

impl MediaCache {
    /// Initialize a new cache connection
    pub fn new(cache_path: &Path) -> Result<Self> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = cache_path.parent() {
            fs::create_dir_all(parent).ok();
        }
        Self::init(Connection::open(cache_path)?)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS catalog_responses (
                id INTEGER PRIMARY KEY,
                endpoint TEXT NOT NULL,
                query TEXT NOT NULL,
                json_data TEXT NOT NULL,
                UNIQUE(endpoint, query)
            )",
            [],
        )?;
        Ok(MediaCache { conn })
    }

    pub fn store<T: Serialize>(&self, endpoint: &str, query: &str, value: &T) -> Result<()> {
        let json_data = serde_json::to_string(value).unwrap_or_default();

        self.conn.execute(
            "INSERT OR REPLACE INTO catalog_responses (endpoint, query, json_data)
             VALUES (?1, ?2, ?3)",
            params![endpoint, query, json_data],
        )?;

        Ok(())
    }

    /// Entries that no longer deserialize count as misses.
    pub fn get<T: DeserializeOwned>(&self, endpoint: &str, query: &str) -> Result<Option<T>> {
        let json_data: Option<String> = self
            .conn
            .query_row(
                "SELECT json_data FROM catalog_responses WHERE endpoint = ?1 AND query = ?2",
                params![endpoint, query],
                |row| row.get(0),
            )
            .optional()?;

        Ok(json_data.and_then(|json| serde_json::from_str(&json).ok()))
    }
}

/// A catalog client with a `MediaCache` in front of it.
pub struct Cached<C> {
    inner: C,
    cache: MediaCache,
}

impl<C> Cached<C> {
    pub fn new(inner: C, cache: MediaCache) -> Self {
        Cached { inner, cache }
    }

    #[cfg(test)]
    pub fn inner(&self) -> &C {
        &self.inner
    }

    // Empty answers are not stored so a later run can still find the title.
    fn lookup<T, F>(&self, endpoint: &str, query: &str, keep: impl Fn(&T) -> bool, fetch: F) -> std::result::Result<T, CatalogError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&C) -> std::result::Result<T, CatalogError>,
    {
        match self.cache.get::<T>(endpoint, query) {
            Ok(Some(hit)) => {
                log::debug!("Cache hit for {endpoint} {query:?}");
                return Ok(hit);
            }
            Ok(None) => log::debug!("Cache miss for {endpoint} {query:?}"),
            Err(e) => log::warn!("Failed to read {endpoint} {query:?} from cache: {e}"),
        }

        let value = fetch(&self.inner)?;
        if keep(&value) {
            if let Err(e) = self.cache.store(endpoint, query, &value) {
                log::error!("Failed to store {endpoint} {query:?} in cache: {e}");
            }
        }
        Ok(value)
    }
}

impl<C: MovieCatalog> MovieCatalog for Cached<C> {
    fn search(&self, name: &str) -> std::result::Result<Vec<MovieCandidate>, CatalogError> {
        self.lookup("movie_search", name, |r: &Vec<_>| !r.is_empty(), |c| c.search(name))
    }
}

impl<C: TvCatalog> TvCatalog for Cached<C> {
    fn search_series(&self, name: &str) -> std::result::Result<Vec<Series>, CatalogError> {
        self.lookup("series_search", name, |r: &Vec<_>| !r.is_empty(), |c| c.search_series(name))
    }

    fn series(&self, id: u64) -> std::result::Result<Series, CatalogError> {
        self.lookup("series", &id.to_string(), |_| true, |c| c.series(id))
    }

    fn episodes(&self, id: u64, filter: EpisodeFilter) -> std::result::Result<Vec<EpisodeRecord>, CatalogError> {
        let query = format!("{}:{}:{}", id, filter.season, filter.episode);
        self.lookup("episodes", &query, |r: &Vec<_>| !r.is_empty(), |c| c.episodes(id, filter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::{FakeMovies, FakeTv};

    #[test]
    fn test_cache_store_and_get() {
        let cache = MediaCache::open_in_memory().unwrap();
        assert_eq!(cache.get::<Vec<Series>>("series_search", "silo").unwrap(), None);

        let series = vec![Series { id: 1, series_name: "Silo".into() }];
        cache.store("series_search", "silo", &series).unwrap();
        assert_eq!(cache.get::<Vec<Series>>("series_search", "silo").unwrap(), Some(series));
        assert_eq!(cache.get::<Vec<Series>>("movie_search", "silo").unwrap(), None);
    }

    #[test]
    fn test_cached_movie_search_hits_inner_once() {
        let inner = FakeMovies::new(&[("Interstellar", "Interstellar", "2014-11-05")]);
        let cached = Cached::new(inner, MediaCache::open_in_memory().unwrap());

        let first = cached.search("Interstellar").unwrap();
        let second = cached.search("Interstellar").unwrap();
        assert_eq!(first, second);
        assert_eq!(cached.inner().calls.get(), 1);

        cached.search("Inception").unwrap();
        assert_eq!(cached.inner().calls.get(), 2);
    }

    #[test]
    fn test_empty_results_are_not_cached() {
        let cached = Cached::new(FakeTv::new(1, "Silo", &[(1, 1, "Freedom Day")]), MediaCache::open_in_memory().unwrap());
        let filter = EpisodeFilter { season: 1, episode: 5 };

        assert!(cached.episodes(1, filter).unwrap().is_empty());
        assert!(cached.episodes(1, filter).unwrap().is_empty());
        assert_eq!(cached.inner().calls.get(), 2);

        let hit = EpisodeFilter { season: 1, episode: 1 };
        cached.episodes(1, hit).unwrap();
        cached.episodes(1, hit).unwrap();
        assert_eq!(cached.inner().calls.get(), 3);
    }

    #[test]
    fn test_cache_file_is_created() {
        let dir = tempfile::Builder::new().prefix("test_cache").tempdir().unwrap();
        let path = dir.path().join("nested/catalog.db");
        let cache = MediaCache::new(&path).unwrap();
        cache.store("series", "1", &Series { id: 1, series_name: "Silo".into() }).unwrap();
        drop(cache);

        let reopened = MediaCache::new(&path).unwrap();
        assert_eq!(reopened.get::<Series>("series", "1").unwrap().map(|s| s.series_name), Some("Silo".to_string()));
    }
}
