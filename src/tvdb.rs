use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_derive::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use url::Url;

use crate::catalog::{EpisodeFilter, EpisodeRecord, Series, TvCatalog};
use crate::error::CatalogError;

const TVDB_API_URL: &str = "https://api.thetvdb.com/";

#[derive(Serialize)]
struct LoginRequest<'a> {
    apikey: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

// Every v2 payload is wrapped: {"data": ...}
#[derive(Deserialize)]
struct DataResponse<T> {
    data: T,
}

/// TV lookups against TheTVDB v2 API. Logs in on first use.
pub struct TvdbClient {
    api_key: String,
    base_url: Url,
    http: Client,
    token: Mutex<Option<String>>,
}

impl TvdbClient {
    pub fn new(api_key: &str) -> Result<Self, CatalogError> {
        Self::with_base_url(api_key, TVDB_API_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, CatalogError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(TvdbClient {
            api_key: api_key.to_string(),
            base_url: Url::parse(base_url)?,
            http,
            token: Mutex::new(None),
        })
    }

    fn token_slot(&self) -> Result<MutexGuard<'_, Option<String>>, CatalogError> {
        self.token
            .lock()
            .map_err(|_| CatalogError::Rejected("tvdb token lock poisoned".into()))
    }

    fn token(&self) -> Result<String, CatalogError> {
        let mut token = self.token_slot()?;
        if let Some(t) = token.as_ref() {
            return Ok(t.clone());
        }

        log::debug!("Logging in to TheTVDB");
        let resp = self
            .http
            .post(self.base_url.join("login")?)
            .json(&LoginRequest { apikey: &self.api_key })
            .send()?
            .error_for_status()?
            .json::<LoginResponse>()?;
        *token = Some(resp.token.clone());
        Ok(resp.token)
    }

    /// `None` when the API answers 404, which it does for empty searches.
    /// Tokens expire after a day; a 401 triggers one fresh login.
    fn get<T: DeserializeOwned>(&self, url: Url) -> Result<Option<T>, CatalogError> {
        let mut resp = self.http.get(url.clone()).bearer_auth(self.token()?).send()?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            log::debug!("TheTVDB token was rejected, logging in again");
            *self.token_slot()? = None;
            resp = self.http.get(url).bearer_auth(self.token()?).send()?;
        }
        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = resp.error_for_status()?.json::<DataResponse<T>>()?;
        Ok(Some(body.data))
    }

    fn search_url(&self, name: &str) -> Result<Url, CatalogError> {
        let mut url = self.base_url.join("search/series")?;
        url.query_pairs_mut().append_pair("name", name);
        Ok(url)
    }

    fn episodes_url(&self, id: u64, filter: EpisodeFilter) -> Result<Url, CatalogError> {
        let mut url = self.base_url.join(&format!("series/{id}/episodes/query"))?;
        url.query_pairs_mut()
            .append_pair("airedSeason", &filter.season.to_string())
            .append_pair("airedEpisode", &filter.episode.to_string());
        Ok(url)
    }
}

impl TvCatalog for TvdbClient {
    fn search_series(&self, name: &str) -> Result<Vec<Series>, CatalogError> {
        log::debug!("Searching TheTVDB for {name:?}");
        Ok(self.get(self.search_url(name)?)?.unwrap_or_default())
    }

    fn series(&self, id: u64) -> Result<Series, CatalogError> {
        self.get(self.base_url.join(&format!("series/{id}"))?)?
            .ok_or_else(|| CatalogError::Rejected(format!("TheTVDB has no series {id}")))
    }

    fn episodes(&self, id: u64, filter: EpisodeFilter) -> Result<Vec<EpisodeRecord>, CatalogError> {
        Ok(self.get(self.episodes_url(id, filter)?)?.unwrap_or_default())
    }
}
