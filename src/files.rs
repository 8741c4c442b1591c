use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Extensions;
use crate::error::{MediaError, Result};
use crate::media::{MediaKind, Metadata};

/// Directory, relative to the media file, that attachments are moved into.
pub const SUBTITLE_DIR: &str = "Subtitles";

/// Subdirectory names searched for subtitles next to media files.
const SUBTITLE_SOURCE_DIRS: [&str; 2] = ["subs", "subtitles"];

/// One artifact on disk. `path` always points at where the file currently is.
#[derive(Debug, Clone, PartialEq)]
pub struct FileEntry {
    stem: String,
    extension: String,
    path: PathBuf,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let extension = path.extension().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        FileEntry { stem, extension, path }
    }

    pub fn stem(&self) -> &str {
        &self.stem
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        join_name(&self.stem, &self.extension)
    }

    fn parent(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Moves the file into `dest`, creating the directory if needed.
    pub fn move_to(&mut self, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest).map_err(|e| MediaError::fs("create directory", dest, e))?;
        let target = dest.join(self.file_name());
        relocate(&self.path, &target, "move")?;
        self.path = target;
        Ok(())
    }

    /// Renames the file within its directory. With `keep_extension` the current
    /// extension is appended to `new_name`, otherwise `new_name` is used verbatim.
    pub fn rename(&mut self, new_name: &str, keep_extension: bool) -> Result<()> {
        let (stem, extension) = if keep_extension {
            (new_name.to_string(), self.extension.clone())
        } else {
            let named = FileEntry::new(new_name);
            (named.stem, named.extension)
        };
        let target = self.parent().join(join_name(&stem, &extension));
        relocate(&self.path, &target, "rename")?;
        self.stem = stem;
        self.extension = extension;
        self.path = target;
        Ok(())
    }
}

fn join_name(stem: &str, extension: &str) -> String {
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    }
}

// Never clobbers: the library may already hold a file with the target name.
fn relocate(from: &Path, to: &Path, operation: &'static str) -> Result<()> {
    if from == to {
        return Ok(());
    }
    if fs::symlink_metadata(to).is_ok() {
        return Err(MediaError::fs(
            operation,
            to,
            io::Error::new(io::ErrorKind::AlreadyExists, "target already exists"),
        ));
    }
    fs::rename(from, to).map_err(|e| MediaError::fs(operation, from, e))
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleFile {
    entry: FileEntry,
    canonical_name: Option<String>,
}

impl SubtitleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SubtitleFile { entry: FileEntry::new(path), canonical_name: None }
    }

    pub fn entry(&self) -> &FileEntry {
        &self.entry
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        self.entry.path()
    }

    #[cfg(test)]
    pub fn canonical_name(&self) -> Option<&str> {
        self.canonical_name.as_deref()
    }
}

/// A primary media file and the subtitles it owns.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    entry: FileEntry,
    kind: MediaKind,
    subtitles: Vec<SubtitleFile>,
    attachment_dir: String,
    canonical_name: Option<String>,
    metadata: Option<Metadata>,
    season: Option<u32>,
    episode: Option<u32>,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>, kind: MediaKind) -> Self {
        MediaFile {
            entry: FileEntry::new(path),
            kind,
            subtitles: Vec::new(),
            attachment_dir: SUBTITLE_DIR.to_string(),
            canonical_name: None,
            metadata: None,
            season: None,
            episode: None,
        }
    }

    pub fn entry(&self) -> &FileEntry {
        &self.entry
    }

    pub fn path(&self) -> &Path {
        self.entry.path()
    }

    pub fn file_name(&self) -> String {
        self.entry.file_name()
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    #[cfg(test)]
    pub fn subtitles(&self) -> &[SubtitleFile] {
        &self.subtitles
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.canonical_name.as_deref()
    }

    /// Sets the canonical name on this file and every attached subtitle.
    pub fn set_canonical_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        for subtitle in &mut self.subtitles {
            subtitle.canonical_name = Some(name.clone());
        }
        self.canonical_name = Some(name);
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn set_metadata(&mut self, metadata: Metadata) {
        self.metadata = Some(metadata);
    }

    pub fn episode_data(&self) -> Option<(u32, u32)> {
        self.season.zip(self.episode)
    }

    pub fn set_episode_data(&mut self, season: u32, episode: u32) {
        self.season = Some(season);
        self.episode = Some(episode);
    }

    pub fn has_subtitle_extension(&self, extension: &str) -> bool {
        self.subtitles
            .iter()
            .any(|s| s.entry.extension().eq_ignore_ascii_case(extension))
    }

    pub fn add_subtitle(&mut self, mut subtitle: SubtitleFile) {
        subtitle.canonical_name = self.canonical_name.clone();
        self.subtitles.push(subtitle);
    }

    /// Attaches a discovered file. Only subtitles can be owned by a media file.
    pub fn attach(&mut self, file: DiscoveredFile) -> Result<()> {
        match file {
            DiscoveredFile::Subtitle(subtitle) => {
                self.add_subtitle(subtitle);
                Ok(())
            }
            DiscoveredFile::Media(media) => Err(MediaError::TypeMismatch(format!(
                "{:?} is not a subtitle file and cannot be attached to {:?}",
                media.path(),
                self.path()
            ))),
        }
    }

    /// Moves the file into `dest` and its subtitles into `dest/Subtitles`.
    pub fn move_to(&mut self, dest: &Path) -> Result<()> {
        self.entry.move_to(dest)?;
        let attachment_dest = dest.join(&self.attachment_dir);
        for subtitle in &mut self.subtitles {
            subtitle.entry.move_to(&attachment_dest)?;
        }
        Ok(())
    }

    /// Renames the file and gives every subtitle the same base name. Subtitles
    /// always keep their own extension.
    pub fn rename(&mut self, new_name: &str, keep_extension: bool) -> Result<()> {
        self.entry.rename(new_name, keep_extension)?;
        for subtitle in &mut self.subtitles {
            log::debug!("Renaming {:?} for {:?}", subtitle.entry.path(), subtitle.canonical_name);
            subtitle.entry.rename(new_name, true)?;
        }
        Ok(())
    }
}

/// Anything discovery can turn up.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveredFile {
    Media(MediaFile),
    Subtitle(SubtitleFile),
}

impl DiscoveredFile {
    /// Classifies `path` by extension. Anything else is not ours to move.
    pub fn classify(path: &Path, kind: MediaKind, extensions: &Extensions) -> Option<Self> {
        if extensions.is_media(path) {
            Some(DiscoveredFile::Media(MediaFile::new(path, kind)))
        } else if extensions.is_subtitle(path) {
            Some(DiscoveredFile::Subtitle(SubtitleFile::new(path)))
        } else {
            None
        }
    }

    pub fn entry(&self) -> &FileEntry {
        match self {
            DiscoveredFile::Media(media) => media.entry(),
            DiscoveredFile::Subtitle(subtitle) => subtitle.entry(),
        }
    }
}

/// Finds the media files of a download.
///
/// `source` may be a media file, a directory, or a path that only exists once
/// one of the media extensions is appended to it. Directories are searched
/// level by level: a level without media files is descended into, a level with
/// media files stops the descent and has its subtitles attached.
pub fn discover(source: &Path, kind: MediaKind, extensions: &Extensions) -> Result<Vec<MediaFile>> {
    let mut found = Vec::new();
    if source.is_dir() {
        collect_level(source, kind, extensions, &mut found)?;
    } else if source.is_file() {
        if extensions.is_media(source) {
            found.push(MediaFile::new(source, kind));
        }
    } else if let Some(path) = with_media_extension(source, extensions) {
        found.push(MediaFile::new(path, kind));
    }

    if found.is_empty() {
        return Err(MediaError::NotFound(format!("no media files found in {source:?}")));
    }
    log::info!(target: "cli", "Discovered {} media file(s) in {:?}", found.len(), source);
    Ok(found)
}

fn with_media_extension(source: &Path, extensions: &Extensions) -> Option<PathBuf> {
    extensions
        .media
        .iter()
        .map(|ext| {
            let mut name = OsString::from(source.as_os_str());
            name.push(".");
            name.push(ext.trim_start_matches('.'));
            PathBuf::from(name)
        })
        .find(|candidate| candidate.is_file())
}

fn collect_level(dir: &Path, kind: MediaKind, extensions: &Extensions, found: &mut Vec<MediaFile>) -> Result<()> {
    let (files, subdirs) = list_dir(dir)?;

    let mut media = Vec::new();
    let mut attachments = Vec::new();
    for file in files.iter().filter_map(|path| DiscoveredFile::classify(path, kind, extensions)) {
        match file {
            DiscoveredFile::Media(m) => media.push(m),
            other => attachments.push(other),
        }
    }

    if media.is_empty() {
        for subdir in &subdirs {
            collect_level(subdir, kind, extensions, found)?;
        }
        return Ok(());
    }

    // Subtitle folders are taken as they are, stray samples included.
    for subdir in subdirs.iter().filter(|d| is_subtitle_dir(d)) {
        let (nested, _) = list_dir(subdir)?;
        attachments.extend(nested.iter().filter_map(|path| DiscoveredFile::classify(path, kind, extensions)));
    }
    attach_subtitles(&mut media, attachments);

    found.append(&mut media);
    Ok(())
}

fn list_dir(dir: &Path) -> Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| MediaError::fs("list directory", dir, e.into()))?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        } else if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok((files, dirs))
}

fn is_subtitle_dir(dir: &Path) -> bool {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|n| SUBTITLE_SOURCE_DIRS.iter().any(|s| s.eq_ignore_ascii_case(n)))
        .unwrap_or(false)
}

// A subtitle belongs to the media file with the longest stem prefixing its own
// stem, or to the only media file of the level.
fn attach_subtitles(media: &mut [MediaFile], attachments: Vec<DiscoveredFile>) {
    for file in attachments {
        let stem = file.entry().stem().to_string();
        let extension = file.entry().extension().to_string();
        let path = file.entry().path().to_path_buf();
        let owner = media
            .iter()
            .enumerate()
            .filter(|(_, m)| stem.starts_with(m.entry.stem()))
            .max_by_key(|(_, m)| m.entry.stem().len())
            .map(|(i, _)| i)
            .or(if media.len() == 1 { Some(0) } else { None });

        let Some(i) = owner else {
            log::warn!("Could not match {path:?} to a media file");
            continue;
        };
        if media[i].has_subtitle_extension(&extension) {
            log::warn!("Leaving {:?} behind, {:?} already has a .{} subtitle", path, media[i].path(), extension);
            continue;
        }
        match media[i].attach(file) {
            Ok(()) => log::debug!("Attached {:?} to {:?}", path, media[i].path()),
            Err(err) => log::warn!("Leaving {path:?} behind: {err}"),
        }
    }
}
