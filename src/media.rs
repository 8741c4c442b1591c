use std::fmt;
use std::str::FromStr;

use crate::catalog::{EpisodeRecord, MovieCandidate, Series};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Tv,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Movie => write!(f, "movie"),
            MediaKind::Tv => write!(f, "tv"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            other => Err(format!("unknown media kind {other:?}, expected movie or tv")),
        }
    }
}

/// Catalog record a media file was resolved against.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Movie(MovieCandidate),
    Episode {
        series: Series,
        episode: EpisodeRecord,
    },
}

impl Metadata {
    pub fn series_name(&self) -> Option<&str> {
        match self {
            Metadata::Movie(_) => None,
            Metadata::Episode { series, .. } => Some(&series.series_name),
        }
    }
}
