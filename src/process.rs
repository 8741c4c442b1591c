use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{BatchPolicy, Config, Directories, Extensions};
use crate::error::{MediaError, Result};
use crate::files::{discover, MediaFile};
use crate::media::MediaKind;
use crate::place::{place_file, PlacedFile};
use crate::resolve::Resolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovering,
    Resolving,
    Placing,
    Cleaning,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedFile {
    pub file: PathBuf,
    pub reason: String,
}

/// Outcome of processing one media item.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessReport {
    pub name: String,
    pub placed: Vec<PlacedFile>,
    pub skipped: Vec<SkippedFile>,
    /// Whether the source directory tree was removed afterwards.
    pub source_removed: bool,
}

/// One download's worth of content on its way into the library.
pub struct MediaItem<'a> {
    name: String,
    source: PathBuf,
    resolver: Resolver<'a>,
    policy: BatchPolicy,
    files: Vec<MediaFile>,
    placed: bool,
    stage: Stage,
}

impl<'a> MediaItem<'a> {
    pub fn new(name: impl Into<String>, source: impl Into<PathBuf>, resolver: Resolver<'a>, policy: BatchPolicy) -> Self {
        MediaItem {
            name: name.into(),
            source: source.into(),
            resolver,
            policy,
            files: Vec::new(),
            placed: false,
            stage: Stage::Discovering,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.resolver.kind()
    }

    #[cfg(test)]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    #[cfg(test)]
    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    /// Runs discovery, resolution, placement and cleanup in order.
    pub fn process(&mut self, config: &Config) -> Result<ProcessReport> {
        match self.run(config) {
            Ok(report) => {
                self.stage = Stage::Done;
                log::info!(target: "cli", "Finished {:?}: {} placed, {} skipped", self.name, report.placed.len(), report.skipped.len());
                Ok(report)
            }
            Err(err) => {
                log::error!("Processing {:?} failed during {:?}: {}", self.name, self.stage, err);
                self.stage = Stage::Failed;
                Err(err)
            }
        }
    }

    fn run(&mut self, config: &Config) -> Result<ProcessReport> {
        self.discover(&config.extensions)?;
        let skipped = self.resolve()?;
        let placed = self.place(&config.directories)?;
        self.finish(placed, skipped)
    }

    // The files are already in the library at this point, so a failed
    // cleanup still hands back where they went.
    fn finish(&mut self, placed: Vec<PlacedFile>, skipped: Vec<SkippedFile>) -> Result<ProcessReport> {
        let mut report = ProcessReport { name: self.name.clone(), placed, skipped, source_removed: false };
        match self.clean(&report.skipped) {
            Ok(removed) => {
                report.source_removed = removed;
                Ok(report)
            }
            Err(err) => Err(MediaError::CleanupFailed { report: Box::new(report), source: Box::new(err) }),
        }
    }

    pub fn discover(&mut self, extensions: &Extensions) -> Result<()> {
        self.stage = Stage::Discovering;
        self.files = discover(&self.source, self.kind(), extensions)?;
        Ok(())
    }

    /// Resolves every discovered file. Files that fail are dropped from the
    /// batch and returned when the policy allows skipping them.
    pub fn resolve(&mut self) -> Result<Vec<SkippedFile>> {
        self.stage = Stage::Resolving;
        let total = self.files.len();
        let mut resolved = Vec::with_capacity(total);
        let mut skipped = Vec::new();

        for mut file in std::mem::take(&mut self.files) {
            match self.resolver.resolve(&mut file) {
                Ok(()) => resolved.push(file),
                Err(err) if self.policy == BatchPolicy::SkipFailed => {
                    log::warn!("Skipping {:?}: {}", file.path(), err);
                    skipped.push(SkippedFile { file: file.path().to_path_buf(), reason: err.to_string() });
                }
                Err(err) => return Err(err),
            }
        }

        if resolved.is_empty() {
            return Err(MediaError::NothingResolved(total));
        }
        self.files = resolved;
        Ok(skipped)
    }

    /// Moves the resolved files into the library. Only ever runs once per item.
    pub fn place(&mut self, dirs: &Directories) -> Result<Vec<PlacedFile>> {
        if self.placed {
            return Err(MediaError::State(format!("{:?} was already placed in the library", self.name)));
        }
        self.placed = true;
        self.stage = Stage::Placing;

        let mut placed = Vec::with_capacity(self.files.len());
        for file in &mut self.files {
            match place_file(&self.resolver, dirs, file) {
                Ok(p) => {
                    log::info!(target: "cli", "Placed {:?} -> {:?}", p.from, p.to);
                    placed.push(p);
                }
                Err(err) if placed.is_empty() => return Err(err),
                Err(err) => return Err(MediaError::PartialPlacement { placed, source: Box::new(err) }),
            }
        }
        Ok(placed)
    }

    /// Removes the source directory. Kept when some files were skipped so that
    /// nothing unresolved is deleted.
    pub fn clean(&mut self, skipped: &[SkippedFile]) -> Result<bool> {
        self.stage = Stage::Cleaning;
        if !self.source.is_dir() {
            return Ok(false);
        }
        if !skipped.is_empty() {
            log::warn!("Keeping {:?}, {} file(s) were not placed", self.source, skipped.len());
            return Ok(false);
        }
        fs::remove_dir_all(&self.source).map_err(|e| MediaError::fs("remove source", &self.source, e))?;
        log::debug!("Removed {:?}", self.source);
        Ok(true)
    }
}

/// Processes one download: `source` is resolved against the download
/// directory when relative. The resolver fixes the media kind.
pub fn process_media_item(config: &Config, name: &str, source: &Path, resolver: Resolver<'_>) -> Result<ProcessReport> {
    let source = config.directories.source_path(source);
    log::info!(target: "cli", "Processing {} {name:?} from {source:?}", resolver.kind());
    MediaItem::new(name, source, resolver, config.batch_policy).process(config)
}
