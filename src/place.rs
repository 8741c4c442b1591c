use std::path::PathBuf;

use crate::config::Directories;
use crate::error::{MediaError, Result};
use crate::files::MediaFile;
use crate::resolve::Resolver;

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedFile {
    pub from: PathBuf,
    pub to: PathBuf,
}

/// Makes a catalog string safe to use as a single path component.
pub fn path_component(name: &str) -> String {
    name.replace(|c: char| c == ':' || c == '/', "").trim().to_string()
}

impl Resolver<'_> {
    /// Library directory a resolved file belongs in.
    pub fn destination(&self, dirs: &Directories, file: &MediaFile) -> Result<PathBuf> {
        if file.kind() != self.kind() {
            return Err(MediaError::TypeMismatch(format!(
                "{:?} was discovered as {} but is being placed as {}",
                file.path(),
                file.kind(),
                self.kind()
            )));
        }
        match self {
            Resolver::Movie(_) => Ok(dirs.movie_root()),
            Resolver::Tv(_) => {
                let show = file
                    .metadata()
                    .and_then(|m| m.series_name())
                    .ok_or_else(|| MediaError::State(format!("{:?} has no resolved show", file.path())))?;
                let (season, _) = file
                    .episode_data()
                    .ok_or_else(|| MediaError::State(format!("{:?} has no episode data", file.path())))?;
                Ok(dirs.tv_root().join(path_component(show)).join(format!("Season {season}")))
            }
        }
    }
}

/// Renames a resolved file to its canonical title, then moves it into the library.
pub fn place_file(resolver: &Resolver<'_>, dirs: &Directories, file: &mut MediaFile) -> Result<PlacedFile> {
    let name = file
        .canonical_name()
        .map(path_component)
        .ok_or_else(|| MediaError::State(format!("{:?} has not been resolved", file.path())))?;
    let dest = resolver.destination(dirs, file)?;
    let from = file.path().to_path_buf();

    file.rename(&name, true)?;
    file.move_to(&dest)?;

    Ok(PlacedFile { from, to: file.path().to_path_buf() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::{FakeMovies, FakeTv};
    use crate::files::SubtitleFile;
    use crate::media::MediaKind;
    use std::fs;
    use std::path::Path;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::File::create(path).unwrap();
    }

    #[test]
    fn test_path_component() {
        assert_eq!(path_component("Star Wars: Andor"), "Star Wars Andor");
        assert_eq!(path_component("AC/DC Live "), "ACDC Live");
    }

    #[test]
    fn test_place_tv_episode() {
        let dir = tempfile::Builder::new().prefix("test_place").tempdir().unwrap();
        let source = dir.path().join("Downloads/The.Mandalorian.S01E01.1080p.WEBRip.x264.mkv");
        let subtitle = dir.path().join("Downloads/The.Mandalorian.S01E01.1080p.WEBRip.x264.srt");
        touch(&source);
        touch(&subtitle);

        let tv = FakeTv::new(7, "The Mandalorian", &[(1, 1, "Chapter 1: The Mandalorian")]);
        let resolver = Resolver::Tv(&tv);
        let dirs = Directories::new(dir.path());

        let mut file = MediaFile::new(&source, MediaKind::Tv);
        file.add_subtitle(SubtitleFile::new(&subtitle));
        resolver.resolve(&mut file).unwrap();
        let placed = place_file(&resolver, &dirs, &mut file).unwrap();

        let season_dir = dir.path().join("TV/The Mandalorian/Season 1");
        assert_eq!(placed.from, source);
        assert_eq!(placed.to, season_dir.join("The Mandalorian - S01E01 - Chapter 1 The Mandalorian.mkv"));
        assert!(placed.to.is_file());
        assert!(season_dir
            .join("Subtitles/The Mandalorian - S01E01 - Chapter 1 The Mandalorian.srt")
            .is_file());
        assert!(!source.exists());
    }

    #[test]
    fn test_place_movie() {
        let dir = tempfile::Builder::new().prefix("test_place").tempdir().unwrap();
        let source = dir.path().join("Downloads/Interstellar.2014.1080p.BluRay.x264/Interstellar.2014.1080p.BluRay.x264.mkv");
        touch(&source);

        let movies = FakeMovies::new(&[("Interstellar", "Interstellar", "2014-11-05")]);
        let resolver = Resolver::Movie(&movies);
        let dirs = Directories::new(dir.path());

        let mut file = MediaFile::new(&source, MediaKind::Movie);
        resolver.resolve(&mut file).unwrap();
        let placed = place_file(&resolver, &dirs, &mut file).unwrap();
        assert_eq!(placed.to, dir.path().join("Movies/Interstellar (2014).mkv"));
        assert!(placed.to.is_file());
    }

    #[test]
    fn test_unresolved_file_is_not_placed() {
        let dir = tempfile::Builder::new().prefix("test_place").tempdir().unwrap();
        let source = dir.path().join("a.mkv");
        touch(&source);

        let movies = FakeMovies::default();
        let resolver = Resolver::Movie(&movies);
        let mut file = MediaFile::new(&source, MediaKind::Movie);

        let result = place_file(&resolver, &Directories::new(dir.path()), &mut file);
        assert!(matches!(result, Err(MediaError::State(_))));
        assert!(source.is_file());
    }

    #[test]
    fn test_kind_mismatch_is_rejected() {
        let dir = tempfile::Builder::new().prefix("test_place").tempdir().unwrap();
        let source = dir.path().join("Heat.1995.mkv");
        touch(&source);

        let tv = FakeTv::default();
        let mut file = MediaFile::new(&source, MediaKind::Movie);
        file.set_canonical_name("Heat (1995)");

        let result = place_file(&Resolver::Tv(&tv), &Directories::new(dir.path()), &mut file);
        assert!(matches!(result, Err(MediaError::TypeMismatch(_))));
        assert!(source.is_file());
    }
}
