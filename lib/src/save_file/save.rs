use std::{
    error,
    fmt,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
};

use derive_more::{Display, From};
use log::{debug, info};

use super::{
    parser::{types::Tick, ParsingError, XmlTree},
    reduce::{ReduceError, Reduction},
    save_file::{SaveFile, SaveFileError},
    structures::{
        extract_game_version, extract_mods, extract_pawns, extract_plants, extract_ticks,
        extract_weather, mark_latest_records, ModRecord, PawnRecord, PlantRecord, WeatherRecord,
    },
    table::RecordTable,
};

/// How a save should be loaded
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Elements to strip from the tree before extraction. None leaves the
    /// tree untouched.
    pub reduction: Option<Reduction>,
    /// Keep the parsed tree around in the [Save]
    pub preserve_tree: bool,
    /// The number of worker threads used when loading a series. Defaults to
    /// the number of logical CPUs.
    pub threads: Option<usize>,
}

/// The step of the loading process that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum LoadStage {
    #[display("opening")]
    Open,
    #[display("parsing")]
    Parse,
    #[display("reducing")]
    Reduce,
    #[display("extracting")]
    Extract,
    #[display("deriving")]
    Derive,
    #[display("writing")]
    Write,
}

/// The underlying cause of a [LoadError]
#[derive(Debug, From, Display)]
pub enum LoadFailure {
    SaveFileError(SaveFileError),
    ReduceError(ReduceError),
    ParsingError(ParsingError),
}

impl error::Error for LoadFailure {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::SaveFileError(err) => Some(err),
            Self::ReduceError(err) => Some(err),
            Self::ParsingError(err) => Some(err),
        }
    }
}

/// An error that occurred while loading a single save, together with the
/// file and the stage it happened in.
#[derive(Debug)]
pub struct LoadError {
    path: PathBuf,
    stage: LoadStage,
    cause: LoadFailure,
}

impl LoadError {
    fn at<E: Into<LoadFailure>>(path: &Path, stage: LoadStage) -> impl FnOnce(E) -> Self + '_ {
        move |err| LoadError {
            path: path.to_path_buf(),
            stage,
            cause: err.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stage(&self) -> LoadStage {
        self.stage
    }

    pub fn cause(&self) -> &LoadFailure {
        &self.cause
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error while {} {}: {}",
            self.stage,
            self.path.display(),
            self.cause
        )
    }
}

impl error::Error for LoadError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// A single loaded save, one snapshot of the game.
///
/// ## Example
///
/// ```no_run
/// use rimworld_history_lib::save_file::{LoadOptions, Save};
///
/// let save = Save::load("/path/to/Colony.rws", &LoadOptions::default()).unwrap();
/// println!("{} plants at tick {}", save.plants().len(), save.ticks());
/// ```
#[derive(Debug)]
pub struct Save {
    file: SaveFile,
    game_version: String,
    ticks: Tick,
    mods: RecordTable<ModRecord>,
    pawns: RecordTable<PawnRecord>,
    plants: RecordTable<PlantRecord>,
    weather: RecordTable<WeatherRecord>,
    removed_elements: usize,
    tree: Option<XmlTree>,
}

impl Save {
    /// Loads the save at the given path.
    ///
    /// The file is parsed, reduced when [LoadOptions::reduction] is set, and
    /// every record type is extracted from it. The tree is dropped afterwards
    /// unless [LoadOptions::preserve_tree] asks otherwise.
    pub fn load<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Save, LoadError> {
        let path = path.as_ref();
        let file = SaveFile::open(path).map_err(LoadError::at(path, LoadStage::Open))?;
        let mut tree = file.parse().map_err(LoadError::at(path, LoadStage::Parse))?;
        let removed_elements = match &options.reduction {
            Some(reduction) => reduction
                .apply(&mut tree)
                .map_err(LoadError::at(path, LoadStage::Reduce))?,
            None => 0,
        };
        let mut save = Save::extract(file, &tree, removed_elements)
            .map_err(LoadError::at(path, LoadStage::Extract))?;
        save.derive()
            .map_err(LoadError::at(path, LoadStage::Derive))?;
        debug!(
            "Loaded {} at tick {}: {} mods, {} pawn records, {} plants",
            path.display(),
            save.ticks,
            save.mods.len(),
            save.pawns.len(),
            save.plants.len()
        );
        if options.preserve_tree {
            save.tree = Some(tree);
        }
        Ok(save)
    }

    fn extract(
        file: SaveFile,
        tree: &XmlTree,
        removed_elements: usize,
    ) -> Result<Save, ParsingError> {
        let ticks = extract_ticks(tree)?;
        Ok(Save {
            file,
            game_version: extract_game_version(tree)?,
            ticks,
            mods: extract_mods(tree, ticks)?.into(),
            pawns: extract_pawns(tree, ticks)?.into(),
            plants: extract_plants(tree, ticks)?.into(),
            weather: vec![extract_weather(tree, ticks)?].into(),
            removed_elements,
            tree: None,
        })
    }

    /// Fills in the values computed from the extracted fields
    fn derive(&mut self) -> Result<(), ParsingError> {
        mark_latest_records(self.pawns.rows_mut());
        for plant in self.plants.rows_mut() {
            plant.derive_growth()?;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// The file name of the save, which is what series index saves by
    pub fn file_name(&self) -> String {
        self.file
            .path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The size of the file on disk, in bytes
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn game_version(&self) -> &str {
        &self.game_version
    }

    /// The number of ticks the game has been running for
    pub fn ticks(&self) -> Tick {
        self.ticks
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

    /// The number of elements removed by the reduction
    pub fn removed_elements(&self) -> usize {
        self.removed_elements
    }

    /// The parsed tree, if it was preserved
    pub fn tree(&self) -> Option<&XmlTree> {
        self.tree.as_ref()
    }
}

/// The outcome of [process_save_file]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessReport {
    pub removed_elements: usize,
    pub input_size: u64,
    pub output_size: u64,
}

impl ProcessReport {
    /// The number of bytes saved. Negative if the output grew.
    pub fn size_difference(&self) -> i64 {
        self.input_size as i64 - self.output_size as i64
    }

    /// The size difference as a percentage of the input size
    pub fn size_difference_percent(&self) -> f64 {
        if self.input_size == 0 {
            return 0.0;
        }
        self.size_difference() as f64 / self.input_size as f64 * 100.0
    }
}

/// Reads the save, strips everything the reduction matches and writes the
/// remaining document, uncompressed, to the output path.
pub fn process_save_file<P: AsRef<Path>, O: AsRef<Path>>(
    input: P,
    output: O,
    reduction: &Reduction,
) -> Result<ProcessReport, LoadError> {
    let input = input.as_ref();
    let output = output.as_ref();
    let file = SaveFile::open(input).map_err(LoadError::at(input, LoadStage::Open))?;
    let mut tree = file.parse().map_err(LoadError::at(input, LoadStage::Parse))?;
    let removed_elements = reduction
        .apply(&mut tree)
        .map_err(LoadError::at(input, LoadStage::Reduce))?;
    let write = || -> Result<u64, SaveFileError> {
        tree.write(BufWriter::new(File::create(output)?))?;
        Ok(fs::metadata(output)?.len())
    };
    let output_size = write().map_err(LoadError::at(output, LoadStage::Write))?;
    let report = ProcessReport {
        removed_elements,
        input_size: file.size(),
        output_size,
    };
    info!(
        "Input file size = {}, output file size = {}, file size reduced by {} ({:.2}%)",
        report.input_size,
        report.output_size,
        report.size_difference(),
        report.size_difference_percent()
    );
    Ok(report)
}
