use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;

use crate::media::MediaKind;

/// What the filename says about its content, before any catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameGuess {
    pub name: String,
    pub year: Option<u16>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl NameGuess {
    pub fn episode_numbers(&self) -> Option<(u32, u32)> {
        self.season.zip(self.episode)
    }
}

lazy_static! {
    /// Release-metadata markers. Order matters: the first pattern that matches
    /// decides where the name ends, so year+resolution comes before the looser forms.
    pub static ref NOISE_PATTERNS_RE: Vec<Regex> = [
        // .2019.1080p.XXXXX
        r"[.+]\d{4}[.+]\d{3,4}p[.+].+",
        // .2019.XXXXX
        r"[.+]\d{4}[.+].*",
        // .1080p
        r"[.+]\d{3,4}p",
        // 2019.1080p.XXXXX at the very start
        r"\d{4}[.+]\d{3,4}p[.+].+",
        // 2019.XXXXX
        r"\d{4}[.+].*",
    ].iter().map(|pattern| Regex::new(pattern).unwrap()).collect();

    static ref YEAR_RE: Regex = Regex::new(r"(?:19|20)\d{2}").unwrap();
    static ref EPISODE_RE: Regex = Regex::new(r"S\d{2}E\d{2}").unwrap();
    static ref SEPARATOR_RE: Regex = Regex::new(r"[.+]").unwrap();
}

/// Extracts name, year and (for TV) season/episode from a raw filename,
/// e.g. `The.Mandalorian.S01E01.x264.WEBRIP.mkv`.
///
/// When no noise marker is found the whole filename minus its extension is
/// taken as the name.
pub fn tokenize(filename: &str, kind: MediaKind) -> NameGuess {
    let candidate = match NOISE_PATTERNS_RE.iter().find_map(|re| re.find(filename)) {
        Some(marker) => &filename[..marker.start()],
        None => Path::new(filename).file_stem().and_then(|s| s.to_str()).unwrap_or(filename),
    };
    let mut name = SEPARATOR_RE.replace_all(candidate, " ").trim().to_string();

    let year = YEAR_RE.find_iter(filename).last().and_then(|m| m.as_str().parse::<u16>().ok());
    if year.is_none() {
        log::debug!("No year found in {filename:?}");
    }

    let mut guess = NameGuess { name: String::new(), year, season: None, episode: None };

    if kind == MediaKind::Tv {
        match EPISODE_RE.find_iter(filename).last() {
            Some(marker) => {
                let marker = marker.as_str();
                guess.season = marker[1..3].parse().ok();
                guess.episode = marker[4..6].parse().ok();
                if let Some(index) = name.find(marker) {
                    name.truncate(index);
                    name.truncate(name.trim_end().len());
                }
            }
            None => log::warn!("No episode data found in {filename:?}"),
        }
    }

    guess.name = name;
    guess
}
