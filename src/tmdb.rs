use reqwest::blocking::Client;
use serde_derive::Deserialize;
use std::time::Duration;
use url::Url;

use crate::catalog::{MovieCandidate, MovieCatalog};
use crate::error::CatalogError;

const TMDB_API_URL: &str = "https://api.themoviedb.org/3/";

// {"page":1,"results":[{"id":157336,"title":"Interstellar","original_title":"Interstellar","release_date":"2014-11-05",...}],"total_results":1}
#[derive(Deserialize, Debug)]
struct SearchResponse {
    results: Vec<MovieCandidate>,
}

/// Movie lookups against The Movie Database.
pub struct TmdbClient {
    api_key: String,
    base_url: Url,
    http: Client,
}

impl TmdbClient {
    pub fn new(api_key: &str) -> Result<Self, CatalogError> {
        Self::with_base_url(api_key, TMDB_API_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, CatalogError> {
        let http = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(TmdbClient { api_key: api_key.to_string(), base_url: Url::parse(base_url)?, http })
    }

    fn search_url(&self, name: &str) -> Result<Url, CatalogError> {
        let endpoint = self.base_url.join("search/movie")?;
        Ok(Url::parse_with_params(endpoint.as_str(), &[("api_key", self.api_key.as_str()), ("query", name)])?)
    }
}

impl MovieCatalog for TmdbClient {
    fn search(&self, name: &str) -> Result<Vec<MovieCandidate>, CatalogError> {
        log::debug!("Searching TMDb for {name:?}");
        let resp = self.http.get(self.search_url(name)?).send()?.error_for_status()?.json::<SearchResponse>()?;
        Ok(resp.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url() {
        let client = TmdbClient::new("secret").unwrap();
        assert_eq!(
            client.search_url("The Grand Budapest Hotel").unwrap().as_str(),
            "https://api.themoviedb.org/3/search/movie?api_key=secret&query=The+Grand+Budapest+Hotel"
        );
    }

    #[test]
    fn test_search_response() {
        let resp: SearchResponse = serde_json::from_str(
            r#"{"page": 1, "results": [
                {"id": 157336, "title": "Interstellar", "original_title": "Interstellar", "release_date": "2014-11-05", "adult": false},
                {"id": 301959, "title": "Interstellar: Nolan's Odyssey"}
            ], "total_results": 2}"#,
        )
        .unwrap();
        assert_eq!(resp.results.len(), 2);
        assert_eq!(resp.results[0].release_year(), Some("2014"));
        assert_eq!(resp.results[1].release_date, "");
    }
}
