use std::error::Error;
use std::path::{Path, PathBuf};

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

mod cache;
mod catalog;
mod config;
mod error;
mod files;
mod media;
mod place;
mod process;
mod resolve;
mod tmdb;
mod tokenize;
mod tvdb;

use crate::cache::{Cached, MediaCache};
use crate::catalog::{MovieCatalog, TvCatalog};
use crate::config::{BatchPolicy, Config};
use crate::error::MediaError;
use crate::media::MediaKind;
use crate::place::PlacedFile;
use crate::process::SkippedFile;
use crate::resolve::Resolver;

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}";

fn init_logging(verbose: bool, log_file: Option<&PathBuf>) -> Result<(), Box<dyn Error>> {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build();

    let mut builder = LogConfig::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");
    if let Some(path) = log_file {
        let file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build(path)?;
        builder = builder.appender(Appender::builder().build("file", Box::new(file)));
        root = root.appender("file");
    }

    log4rs::init_config(builder.build(root.build(level))?)?;
    Ok(())
}

fn movie_catalog(config: &Config) -> Result<Box<dyn MovieCatalog>, Box<dyn Error>> {
    let client = tmdb::TmdbClient::new(config.api_key(MediaKind::Movie)?)?;
    let catalog: Box<dyn MovieCatalog> = match &config.cache_path {
        Some(path) => Box::new(Cached::new(client, MediaCache::new(path)?)),
        None => Box::new(client),
    };
    Ok(catalog)
}

fn tv_catalog(config: &Config) -> Result<Box<dyn TvCatalog>, Box<dyn Error>> {
    let client = tvdb::TvdbClient::new(config.api_key(MediaKind::Tv)?)?;
    let catalog: Box<dyn TvCatalog> = match &config.cache_path {
        Some(path) => Box::new(Cached::new(client, MediaCache::new(path)?)),
        None => Box::new(client),
    };
    Ok(catalog)
}

fn main() -> Result<(), Box<dyn Error>> {
    let app = clap::Command::new("nasshelf")
        .about("Renames and moves a finished download into the media library")
        .arg(clap::Arg::new("config").long("config").short('c').required(true).help("Path to config JSON file"))
        .arg(clap::Arg::new("kind").long("kind").required(true).value_parser(["movie", "tv"]).help("What the download contains"))
        .arg(clap::Arg::new("name").long("name").help("Label used in logs, defaults to the source name"))
        .arg(clap::Arg::new("abort-on-failure").long("abort-on-failure").help("Fail the whole download when one file cannot be resolved").action(clap::ArgAction::SetTrue))
        .arg(clap::Arg::new("keep-going").long("keep-going").help("Skip files that cannot be resolved").action(clap::ArgAction::SetTrue).conflicts_with("abort-on-failure"))
        .arg(clap::Arg::new("verbose").long("verbose").short('v').action(clap::ArgAction::SetTrue))
        .arg(clap::Arg::new("log-file").long("log-file").value_parser(clap::value_parser!(PathBuf)))
        .arg(clap::Arg::new("source").required(true).help("Download to process, relative to the download directory or absolute"))
        .get_matches();

    init_logging(app.get_flag("verbose"), app.get_one::<PathBuf>("log-file"))?;

    let config_path = app.get_one::<String>("config").expect("config is required");
    let mut config = Config::load(Path::new(config_path))?;
    if app.get_flag("abort-on-failure") {
        config.batch_policy = BatchPolicy::AbortOnFailure;
    } else if app.get_flag("keep-going") {
        config.batch_policy = BatchPolicy::SkipFailed;
    }

    let kind: MediaKind = app.get_one::<String>("kind").expect("kind is required").parse()?;
    let source = Path::new(app.get_one::<String>("source").expect("source is required"));
    let name = app
        .get_one::<String>("name")
        .cloned()
        .or_else(|| source.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_default();

    let result = match kind {
        MediaKind::Movie => {
            let movies = movie_catalog(&config)?;
            process::process_media_item(&config, &name, source, Resolver::Movie(movies.as_ref()))
        }
        MediaKind::Tv => {
            let tv = tv_catalog(&config)?;
            process::process_media_item(&config, &name, source, Resolver::Tv(tv.as_ref()))
        }
    };

    match &result {
        Ok(report) => log_report(&report.placed, &report.skipped),
        Err(MediaError::CleanupFailed { report, .. }) => log_report(&report.placed, &report.skipped),
        Err(MediaError::PartialPlacement { placed, .. }) => log_report(placed, &[]),
        Err(_) => {}
    }
    result?;
    Ok(())
}

fn log_report(placed: &[PlacedFile], skipped: &[SkippedFile]) {
    for placed in placed {
        log::info!(target: "cli", "{:?} -> {:?}", placed.from, placed.to);
    }
    for skipped in skipped {
        log::warn!(target: "cli", "Skipped {:?}: {}", skipped.file, skipped.reason);
    }
}
