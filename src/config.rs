use serde_derive::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{MediaError, Result};
use crate::media::MediaKind;

/// What to do when a single file of a batch cannot be resolved.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchPolicy {
    /// Record the file as skipped and keep going with the rest of the batch.
    #[default]
    SkipFailed,
    /// Fail the whole media item on the first unresolved file.
    AbortOnFailure,
}

/// Library layout. `download`, `movie` and `tv` are relative to `local`
/// unless given as absolute paths.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Directories {
    pub local: PathBuf,
    #[serde(default = "default_download_dir")]
    pub download: PathBuf,
    #[serde(default = "default_movie_dir")]
    pub movie: PathBuf,
    #[serde(default = "default_tv_dir")]
    pub tv: PathBuf,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Extensions {
    #[serde(default = "default_media_extensions")]
    pub media: Vec<String>,
    #[serde(default = "default_subtitle_extensions")]
    pub subtitle: Vec<String>,
}

/// Each key is only needed for the kind of media it looks up.
#[derive(Deserialize, Debug, Clone, PartialEq, Default)]
pub struct ApiKeys {
    #[serde(default)]
    pub tmdb: Option<String>,
    #[serde(default)]
    pub tvdb: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub directories: Directories,
    #[serde(default)]
    pub extensions: Extensions,
    #[serde(default)]
    pub api_keys: ApiKeys,
    #[serde(default)]
    pub batch_policy: BatchPolicy,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("Downloads")
}

fn default_movie_dir() -> PathBuf {
    PathBuf::from("Movies")
}

fn default_tv_dir() -> PathBuf {
    PathBuf::from("TV")
}

fn default_media_extensions() -> Vec<String> {
    ["mkv", "mp4", "avi", "m4v", "mov", "wmv", "webm"].iter().map(|s| s.to_string()).collect()
}

fn default_subtitle_extensions() -> Vec<String> {
    ["srt", "sub", "idx", "ass", "ssa", "vtt"].iter().map(|s| s.to_string()).collect()
}

impl Default for Extensions {
    fn default() -> Self {
        Extensions {
            media: default_media_extensions(),
            subtitle: default_subtitle_extensions(),
        }
    }
}

impl Extensions {
    pub fn is_media(&self, path: &Path) -> bool {
        has_extension(path, &self.media)
    }

    pub fn is_subtitle(&self, path: &Path) -> bool {
        has_extension(path, &self.subtitle)
    }
}

// Configured values may or may not carry the leading dot.
fn has_extension(path: &Path, allowed: &[String]) -> bool {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) => allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(ext)),
        None => false,
    }
}

impl Directories {
    #[cfg(test)]
    pub fn new(local: impl Into<PathBuf>) -> Self {
        Directories {
            local: local.into(),
            download: default_download_dir(),
            movie: default_movie_dir(),
            tv: default_tv_dir(),
        }
    }

    pub fn download_root(&self) -> PathBuf {
        self.local.join(&self.download)
    }

    pub fn movie_root(&self) -> PathBuf {
        self.local.join(&self.movie)
    }

    pub fn tv_root(&self) -> PathBuf {
        self.local.join(&self.tv)
    }

    /// Relative sources are looked up in the download area.
    pub fn source_path(&self, source: &Path) -> PathBuf {
        if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.download_root().join(source)
        }
    }
}

impl Config {
    #[cfg(test)]
    pub fn new(directories: Directories) -> Self {
        Config {
            directories,
            extensions: Extensions::default(),
            api_keys: ApiKeys::default(),
            batch_policy: BatchPolicy::default(),
            cache_path: None,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| MediaError::fs("read config", path, e))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).map_err(|e| MediaError::Config(e.to_string()))
    }

    /// The key of the catalog that resolves `kind`.
    pub fn api_key(&self, kind: MediaKind) -> Result<&str> {
        let key = match kind {
            MediaKind::Movie => &self.api_keys.tmdb,
            MediaKind::Tv => &self.api_keys.tvdb,
        };
        key.as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MediaError::Config(format!("api_keys has no key for {kind} lookups")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_json(r#"{"directories": {"local": "/srv/media"}}"#).unwrap();
        assert_eq!(config.directories.download_root(), PathBuf::from("/srv/media/Downloads"));
        assert_eq!(config.directories.movie_root(), PathBuf::from("/srv/media/Movies"));
        assert_eq!(config.directories.tv_root(), PathBuf::from("/srv/media/TV"));
        assert_eq!(config.batch_policy, BatchPolicy::SkipFailed);
        assert!(config.extensions.media.contains(&"mkv".to_string()));
        assert!(matches!(config.api_key(MediaKind::Movie), Err(MediaError::Config(_))));
    }

    #[test]
    fn test_config_full() {
        let config = Config::from_json(
            r#"{
                "directories": {"local": "/data", "download": "dl", "movie": "films", "tv": "/mnt/tv"},
                "extensions": {"media": [".MKV"], "subtitle": ["srt"]},
                "api_keys": {"tmdb": "abc", "tvdb": "def"},
                "batch_policy": "abort_on_failure"
            }"#,
        )
        .unwrap();
        assert_eq!(config.directories.movie_root(), PathBuf::from("/data/films"));
        assert_eq!(config.directories.tv_root(), PathBuf::from("/mnt/tv"));
        assert_eq!(config.batch_policy, BatchPolicy::AbortOnFailure);
        assert_eq!(config.api_key(MediaKind::Movie).unwrap(), "abc");
        assert_eq!(config.api_key(MediaKind::Tv).unwrap(), "def");
        assert!(config.extensions.is_media(Path::new("a/b.mkv")));
        assert!(!config.extensions.is_media(Path::new("a/b.mp4")));
        assert!(config.extensions.is_subtitle(Path::new("b.SRT")));
    }

    #[test]
    fn test_movie_only_api_keys() {
        let config =
            Config::from_json(r#"{"directories": {"local": "/srv"}, "api_keys": {"tmdb": "abc"}}"#).unwrap();
        assert_eq!(config.api_key(MediaKind::Movie).unwrap(), "abc");
        assert!(matches!(config.api_key(MediaKind::Tv), Err(MediaError::Config(_))));
    }

    #[test]
    fn test_source_path() {
        let dirs = Directories::new("/srv");
        assert_eq!(dirs.source_path(Path::new("Show.S01")), PathBuf::from("/srv/Downloads/Show.S01"));
        assert_eq!(dirs.source_path(Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }

    #[test]
    fn test_bad_config() {
        assert!(matches!(Config::from_json("{}"), Err(MediaError::Config(_))));
    }
}
