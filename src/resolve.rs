use crate::catalog::{EpisodeFilter, MovieCandidate, MovieCatalog, TvCatalog};
use crate::error::{MediaError, Result};
use crate::files::MediaFile;
use crate::media::{MediaKind, Metadata};
use crate::tokenize::{tokenize, NameGuess};

/// Kind-specific resolution, chosen once per media item together with the
/// catalog it queries.
#[derive(Clone, Copy)]
pub enum Resolver<'a> {
    Movie(&'a dyn MovieCatalog),
    Tv(&'a dyn TvCatalog),
}

impl Resolver<'_> {
    pub fn kind(&self) -> MediaKind {
        match self {
            Resolver::Movie(_) => MediaKind::Movie,
            Resolver::Tv(_) => MediaKind::Tv,
        }
    }

    /// Tokenizes the file's name, looks it up and stores the canonical title
    /// and metadata on the file.
    pub fn resolve(&self, file: &mut MediaFile) -> Result<()> {
        let filename = file.file_name();
        let guess = tokenize(&filename, self.kind());
        log::debug!("Guessed {guess:?} from {filename:?}");

        let (title, metadata) = match self {
            Resolver::Movie(catalog) => resolve_movie(*catalog, &guess)?,
            Resolver::Tv(catalog) => resolve_episode(*catalog, &guess)?,
        };
        let title = strip_illegal_characters(&title);
        log::info!(target: "cli", "Resolved {filename:?} as {title:?}");

        if let Some((season, episode)) = guess.episode_numbers().filter(|_| self.kind() == MediaKind::Tv) {
            file.set_episode_data(season, episode);
        }
        file.set_metadata(metadata);
        file.set_canonical_name(title);
        Ok(())
    }
}

/// Removes characters that are illegal in filenames on common targets.
pub fn strip_illegal_characters(title: &str) -> String {
    title.replace(':', "")
}

fn require_name(guess: &NameGuess) -> Result<&str> {
    if guess.name.is_empty() {
        Err(MediaError::NotFound("no title could be read from the filename".into()))
    } else {
        Ok(&guess.name)
    }
}

pub fn resolve_movie(catalog: &dyn MovieCatalog, guess: &NameGuess) -> Result<(String, Metadata)> {
    let name = require_name(guess)?;
    let candidates = catalog.search(name)?;
    let movie = select_movie(&candidates, guess.year).map_err(|e| match e {
        MediaError::AmbiguousMatch(reason) => MediaError::AmbiguousMatch(format!("{name:?}: {reason}")),
        other => other,
    })?;
    let year = movie.release_year().unwrap_or_default();
    let title = format!("{} ({})", movie.display_title(), year);
    Ok((title, Metadata::Movie(movie.clone())))
}

/// Picks the first candidate, in catalog order, released in `year`. Without a
/// year the first candidate that has a release year is taken.
pub fn select_movie(candidates: &[MovieCandidate], year: Option<u16>) -> Result<&MovieCandidate> {
    if candidates.is_empty() {
        return Err(MediaError::NotFound("the catalog returned no candidates".into()));
    }
    let selected = match year {
        Some(year) => {
            let year = year.to_string();
            candidates.iter().find(|c| c.release_date.starts_with(&year))
        }
        None => candidates.iter().find(|c| c.release_year().is_some()),
    };
    selected.ok_or_else(|| match year {
        Some(year) => MediaError::AmbiguousMatch(format!(
            "none of {} candidates was released in {}",
            candidates.len(),
            year
        )),
        None => MediaError::AmbiguousMatch(format!("none of {} candidates has a release date", candidates.len())),
    })
}

pub fn resolve_episode(catalog: &dyn TvCatalog, guess: &NameGuess) -> Result<(String, Metadata)> {
    let name = require_name(guess)?;
    let (season, episode) = guess
        .episode_numbers()
        .ok_or_else(|| MediaError::NotFound(format!("no season/episode numbers for {name:?}")))?;

    let hit = catalog
        .search_series(name)?
        .into_iter()
        .next()
        .ok_or_else(|| MediaError::NotFound(format!("no show matches {name:?}")))?;
    let series = catalog.series(hit.id)?;

    let record = catalog
        .episodes(series.id, EpisodeFilter { season, episode })?
        .into_iter()
        .next()
        .ok_or_else(|| {
            MediaError::NotFound(format!("{} has no episode S{:02}E{:02}", series.series_name, season, episode))
        })?;

    let title = format!(
        "{} - S{:02}E{:02} - {}",
        series.series_name,
        season,
        episode,
        record.episode_name.as_deref().unwrap_or_default()
    );
    Ok((title, Metadata::Episode { series, episode: record }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fake::{FakeMovies, FakeTv};

    fn guess(filename: &str, kind: MediaKind) -> NameGuess {
        tokenize(filename, kind)
    }

    #[test]
    fn test_interstellar() {
        let movies = FakeMovies::new(&[("Interstellar", "Interstellar", "2014-11-05")]);
        let (title, metadata) =
            resolve_movie(&movies, &guess("Interstellar.2014.1080p.BluRay.x264.mkv", MediaKind::Movie)).unwrap();
        assert_eq!(title, "Interstellar (2014)");
        assert!(matches!(metadata, Metadata::Movie(ref m) if m.release_date == "2014-11-05"));
    }

    #[test]
    fn test_movie_year_picks_first_match_in_catalog_order() {
        let movies = FakeMovies::new(&[
            ("Dune", "Dune", "2021-09-15"),
            ("Dune", "Dune", "1984-12-14"),
            ("Dune Part Two", "Dune: Part Two", "1984-01-01"),
        ]);
        let (title, _) = resolve_movie(&movies, &guess("Dune.1984.720p.BluRay.mkv", MediaKind::Movie)).unwrap();
        assert_eq!(title, "Dune (1984)");
    }

    #[test]
    fn test_movie_uses_original_title_and_strips_colons() {
        let movies = FakeMovies::new(&[("Amelie", "Le Fabuleux Destin d'Amélie Poulain: Édition", "2001-04-25")]);
        let (title, _) = resolve_movie(&movies, &guess("Amelie.2001.1080p.mkv", MediaKind::Movie)).unwrap();
        assert_eq!(strip_illegal_characters(&title), "Le Fabuleux Destin d'Amélie Poulain Édition (2001)");
    }

    #[test]
    fn test_movie_year_mismatch_is_ambiguous() {
        let movies = FakeMovies::new(&[("Heat", "Heat", "1986-01-01"), ("Heat", "Heat", "2013-02-01")]);
        let result = resolve_movie(&movies, &guess("Heat.1995.1080p.mkv", MediaKind::Movie));
        assert!(matches!(result, Err(MediaError::AmbiguousMatch(_))));
    }

    #[test]
    fn test_movie_without_candidates_is_not_found() {
        let movies = FakeMovies::default();
        let result = resolve_movie(&movies, &guess("Nothing.2020.1080p.mkv", MediaKind::Movie));
        assert!(matches!(result, Err(MediaError::NotFound(_))));
    }

    #[test]
    fn test_movie_without_year_takes_first_dated_candidate() {
        let candidates = FakeMovies::new(&[("Alien", "Alien", ""), ("Alien", "Alien", "1979-05-25")]).candidates;
        assert_eq!(select_movie(&candidates, None).unwrap().release_date, "1979-05-25");
    }

    #[test]
    fn test_mandalorian_episode() {
        let tv = FakeTv::new(361753, "The Mandalorian", &[(1, 1, "Chapter 1: The Mandalorian"), (1, 2, "Chapter 2: The Child")]);
        let resolver = Resolver::Tv(&tv);

        let mut file = MediaFile::new("/downloads/The.Mandalorian.S01E02.1080p.WEBRip.x264.mkv", MediaKind::Tv);
        resolver.resolve(&mut file).unwrap();

        assert_eq!(file.canonical_name(), Some("The Mandalorian - S01E02 - Chapter 2 The Child"));
        assert_eq!(file.episode_data(), Some((1, 2)));
        assert_eq!(file.metadata().and_then(|m| m.series_name()), Some("The Mandalorian"));
        assert_eq!(tv.calls.get(), 3);
    }

    #[test]
    fn test_missing_episode_is_not_found() {
        let tv = FakeTv::new(1, "Silo", &[(1, 1, "Freedom Day")]);
        let result = resolve_episode(&tv, &guess("Silo.S01E09.720p.mkv", MediaKind::Tv));
        assert!(matches!(result, Err(MediaError::NotFound(_))));

        let unknown_show = resolve_episode(&tv, &guess("Severance.S01E01.720p.mkv", MediaKind::Tv));
        assert!(matches!(unknown_show, Err(MediaError::NotFound(_))));

        let no_marker = resolve_episode(&tv, &guess("Silo.720p.mkv", MediaKind::Tv));
        assert!(matches!(no_marker, Err(MediaError::NotFound(_))));
    }

    #[test]
    fn test_movie_resolver_sets_no_episode_data() {
        let movies = FakeMovies::new(&[("Interstellar", "Interstellar", "2014-11-05")]);
        let resolver = Resolver::Movie(&movies);
        assert_eq!(resolver.kind(), MediaKind::Movie);

        let mut file = MediaFile::new("/downloads/Interstellar.2014.1080p.BluRay.x264.mkv", MediaKind::Movie);
        resolver.resolve(&mut file).unwrap();
        assert_eq!(file.canonical_name(), Some("Interstellar (2014)"));
        assert_eq!(file.episode_data(), None);
        assert_eq!(movies.calls.get(), 1);
    }
}
