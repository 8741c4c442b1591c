//! Query/response contract of the metadata catalogs.
//!
//! The resolver only ever talks to these traits; concrete clients live in
//! `tmdb` and `tvdb`, and `cache::Cached` can sit in front of either.

use serde_derive::{Deserialize, Serialize};

use crate::error::CatalogError;

// {"title":"Interstellar","original_title":"Interstellar","release_date":"2014-11-05","id":157336,...}
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MovieCandidate {
    pub title: String,
    #[serde(default)]
    pub original_title: String,
    #[serde(default)]
    pub release_date: String,
}

impl MovieCandidate {
    /// Year part of `release_date` ("YYYY-MM-DD"), if it has one.
    pub fn release_year(&self) -> Option<&str> {
        let year = self.release_date.split('-').next()?;
        (year.len() == 4 && year.chars().all(|c| c.is_ascii_digit())).then_some(year)
    }

    pub fn display_title(&self) -> &str {
        if self.original_title.is_empty() {
            &self.title
        } else {
            &self.original_title
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Series {
    pub id: u64,
    #[serde(rename = "seriesName", default)]
    pub series_name: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct EpisodeRecord {
    #[serde(rename = "episodeName", default)]
    pub episode_name: Option<String>,
    #[serde(rename = "airedSeason", default)]
    pub aired_season: Option<u32>,
    #[serde(rename = "airedEpisodeNumber", default)]
    pub aired_episode: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpisodeFilter {
    pub season: u32,
    pub episode: u32,
}

pub trait MovieCatalog {
    /// Candidates for an approximate title, in catalog relevance order.
    fn search(&self, name: &str) -> Result<Vec<MovieCandidate>, CatalogError>;
}

pub trait TvCatalog {
    fn search_series(&self, name: &str) -> Result<Vec<Series>, CatalogError>;

    fn series(&self, id: u64) -> Result<Series, CatalogError>;

    fn episodes(&self, id: u64, filter: EpisodeFilter) -> Result<Vec<EpisodeRecord>, CatalogError>;
}
