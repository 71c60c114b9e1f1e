use std::{
    collections::BTreeMap,
    error, fs, io,
    path::{Path, PathBuf},
};

use derive_more::{Display, From};
use log::{debug, info};
use rayon::{prelude::*, ThreadPoolBuildError, ThreadPoolBuilder};
use regex::Regex;

use super::save_file::{
    is_save_file_name,
    structures::{ModRecord, PawnRecord, PlantRecord, WeatherRecord},
    LoadError, LoadOptions, RecordTable, Save, TableError,
};

/// Concatenation of per save tables
mod aggregate;
pub use aggregate::{aggregate, aggregate_pawns, AggregateError};

/// An error that can occur when loading a series of saves
#[derive(Debug, From, Display)]
pub enum SeriesError {
    IoError(io::Error),
    /// The file name pattern is not a valid regular expression
    RegexError(regex::Error),
    #[display("no save files in {} match {pattern}", directory.display())]
    NoMatchingFiles { directory: PathBuf, pattern: String },
    /// One of the saves failed to load, which aborts the whole series
    LoadError(LoadError),
    ThreadPoolError(ThreadPoolBuildError),
    AggregateError(AggregateError),
    TableError(TableError),
}

impl error::Error for SeriesError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::IoError(err) => Some(err),
            Self::RegexError(err) => Some(err),
            Self::LoadError(err) => Some(err),
            Self::ThreadPoolError(err) => Some(err),
            Self::AggregateError(err) => Some(err),
            Self::TableError(err) => Some(err),
            Self::NoMatchingFiles { .. } => None,
        }
    }
}

/// Checks whether the pattern matches the start of the name.
/// The match does not have to cover the whole name.
fn matches_start(pattern: &Regex, name: &str) -> bool {
    pattern.find(name).is_some_and(|m| m.start() == 0)
}

/// Lists the save files in the directory whose names match the pattern,
/// sorted by file name
pub fn find_save_files<P: AsRef<Path>>(
    directory: P,
    pattern: &Regex,
) -> Result<Vec<PathBuf>, io::Error> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if is_save_file_name(name) && matches_start(pattern, name) {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// A time ordered collection of saves from the same game.
///
/// ## Example
///
/// ```no_run
/// use rimworld_history_lib::{save_file::LoadOptions, series::SaveSeries};
///
/// let series = SaveSeries::load("/path/to/Saves", "Colony", &LoadOptions::default()).unwrap();
/// for save in series.saves() {
///     println!("{}: {} plants", save.file_name(), save.plants().len());
/// }
/// println!("{} plant rows in total", series.plants().len());
/// ```
#[derive(Debug)]
pub struct SaveSeries {
    directory: PathBuf,
    pattern: String,
    saves: BTreeMap<String, Save>,
    mods: RecordTable<ModRecord>,
    pawns: RecordTable<PawnRecord>,
    plants: RecordTable<PlantRecord>,
    weather: RecordTable<WeatherRecord>,
}

impl SaveSeries {
    /// Loads every save in the directory whose file name starts with a match
    /// of the pattern
    pub fn load<P: AsRef<Path>>(
        directory: P,
        pattern: &str,
        options: &LoadOptions,
    ) -> Result<Self, SeriesError> {
        Self::load_with_progress(directory, pattern, options, &|_: &str| {})
    }

    /// Same as [SaveSeries::load], but calls `progress` with the file name of
    /// every save once it is loaded. The callback is called from the worker
    /// threads.
    pub fn load_with_progress<P: AsRef<Path>>(
        directory: P,
        pattern: &str,
        options: &LoadOptions,
        progress: &(dyn Fn(&str) + Sync),
    ) -> Result<Self, SeriesError> {
        let directory = directory.as_ref();
        let regex = Regex::new(pattern)?;
        let paths = find_save_files(directory, &regex)?;
        if paths.is_empty() {
            return Err(SeriesError::NoMatchingFiles {
                directory: directory.to_path_buf(),
                pattern: pattern.to_owned(),
            });
        }
        let threads = options.threads.unwrap_or_else(num_cpus::get).max(1);
        info!(
            "Loading {} saves from {} using {} threads",
            paths.len(),
            directory.display(),
            threads
        );
        let pool = ThreadPoolBuilder::new().num_threads(threads).build()?;
        let loaded = pool.install(|| {
            paths
                .par_iter()
                .map(|path| -> Result<Save, LoadError> {
                    let save = Save::load(path, options)?;
                    progress(&save.file_name());
                    Ok(save)
                })
                .collect::<Result<Vec<_>, LoadError>>()
        })?;
        let saves: BTreeMap<String, Save> = loaded
            .into_iter()
            .map(|save| (save.file_name(), save))
            .collect();
        let series = SaveSeries {
            directory: directory.to_path_buf(),
            pattern: pattern.to_owned(),
            mods: aggregate(saves.values(), Save::mods)?,
            pawns: aggregate_pawns(saves.values())?,
            plants: aggregate(saves.values(), Save::plants)?,
            weather: aggregate(saves.values(), Save::weather)?,
            saves,
        };
        debug!(
            "Series aggregated: {} mods, {} pawn records, {} plants, {} weather records",
            series.mods.len(),
            series.pawns.len(),
            series.plants.len(),
            series.weather.len()
        );
        Ok(series)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// The file name pattern the series was loaded with
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn len(&self) -> usize {
        self.saves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.saves.is_empty()
    }

    /// The saves, ordered by file name
    pub fn saves(&self) -> impl Iterator<Item = &Save> {
        self.saves.values()
    }

    /// Looks up a save by its file name
    pub fn save(&self, file_name: &str) -> Option<&Save> {
        self.saves.get(file_name)
    }

    /// The save furthest along in the game. When several saves share the
    /// highest tick count, the first one by file name is returned.
    pub fn latest_save(&self) -> Option<&Save> {
        self.saves.values().fold(None, |latest: Option<&Save>, save| match latest {
            Some(latest) if latest.ticks() >= save.ticks() => Some(latest),
            _ => Some(save),
        })
    }

    pub fn mods(&self) -> &RecordTable<ModRecord> {
        &self.mods
    }

    pub fn pawns(&self) -> &RecordTable<PawnRecord> {
        &self.pawns
    }

    pub fn plants(&self) -> &RecordTable<PlantRecord> {
        &self.plants
    }

    pub fn weather(&self) -> &RecordTable<WeatherRecord> {
        &self.weather
    }

    /// Writes every aggregated table into the directory as a CSV file named
    /// after the record type. Returns the written paths.
    pub fn export_csv<P: AsRef<Path>>(&self, directory: P) -> Result<Vec<PathBuf>, SeriesError> {
        let directory = directory.as_ref();
        fs::create_dir_all(directory)?;
        let paths = vec![
            directory.join("mods.csv"),
            directory.join("pawns.csv"),
            directory.join("plants.csv"),
            directory.join("weather.csv"),
        ];
        self.mods.write_csv_file(&paths[0])?;
        self.pawns.write_csv_file(&paths[1])?;
        self.plants.write_csv_file(&paths[2])?;
        self.weather.write_csv_file(&paths[3])?;
        Ok(paths)
    }
}
