use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::place::PlacedFile;
use crate::process::ProcessReport;

pub type Result<T> = std::result::Result<T, MediaError>;

/// Failures talking to a metadata catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid catalog url: {0}")]
    Url(#[from] url::ParseError),
    #[error("catalog rejected the request: {0}")]
    Rejected(String),
}

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("ambiguous match: {0}")]
    AmbiguousMatch(String),
    #[error("{operation} failed for {path:?}: {source}")]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid state: {0}")]
    State(String),
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("none of the {0} discovered media files could be resolved")]
    NothingResolved(usize),
    #[error("placement stopped after {} file(s) were placed: {source}", .placed.len())]
    PartialPlacement {
        placed: Vec<PlacedFile>,
        #[source]
        source: Box<MediaError>,
    },
    #[error("{} file(s) were placed but the source was not removed: {source}", .report.placed.len())]
    CleanupFailed {
        report: Box<ProcessReport>,
        #[source]
        source: Box<MediaError>,
    },
}

impl MediaError {
    pub fn fs(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        MediaError::Filesystem { operation, path: path.into(), source }
    }
}
