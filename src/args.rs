use clap::ArgAction;
use clap_derive::{Parser, Subcommand};
use derive_more::{Display, Error};
use dialoguer::{Completion, Input, Select};

use std::{
    fs,
    path::{Path, PathBuf},
};

use rimworld_history_lib::save_file::is_save_file_name;

/// A [Completion] struct for save file names, that also acts as a list of save files in the current directory.
struct SaveFileNameCompletion {
    save_files: Vec<String>,
}

impl Default for SaveFileNameCompletion {
    fn default() -> Self {
        let mut res = Vec::new();
        if let Ok(entries) = fs::read_dir(".") {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_file() && is_save_file_name(&entry.file_name().to_string_lossy()) {
                    res.push(path.to_string_lossy().into_owned());
                }
            }
        }
        res.sort();
        SaveFileNameCompletion { save_files: res }
    }
}

impl Completion for SaveFileNameCompletion {
    fn get(&self, input: &str) -> Option<String> {
        self.save_files.iter().find(|x| x.contains(input)).cloned()
    }
}

#[derive(Debug, Display, Error)]
enum InvalidPath {
    #[display("invalid path (does not exist)")]
    InvalidPath,
    #[display("not a file")]
    NotAFile,
    #[display("not a directory")]
    NotADir,
}

/// A function to validate the file path input.
fn validate_file_path(input: &String) -> Result<(), InvalidPath> {
    let p = Path::new(input);
    if !p.exists() {
        Err(InvalidPath::InvalidPath)
    } else if !p.is_file() {
        Err(InvalidPath::NotAFile)
    } else {
        Ok(())
    }
}

/// A function to validate the directory path input.
fn validate_dir_path(input: &String) -> Result<(), InvalidPath> {
    let p = Path::new(input);
    if !p.exists() {
        Err(InvalidPath::InvalidPath)
    } else if !p.is_dir() {
        Err(InvalidPath::NotADir)
    } else {
        Ok(())
    }
}

/// A function to parse a path argument that has to point to a file.
fn parse_file_arg(input: &str) -> Result<PathBuf, InvalidPath> {
    let p = PathBuf::from(input);
    validate_file_path(&input.to_owned())?;
    Ok(p)
}

/// A function to parse a path argument that has to point to a directory.
fn parse_dir_arg(input: &str) -> Result<PathBuf, InvalidPath> {
    let p = PathBuf::from(input);
    validate_dir_path(&input.to_owned())?;
    Ok(p)
}

/// The arguments to the program.
#[derive(Parser)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    /// What to do. If not provided, the program asks.
    pub command: Option<Command>,
    #[arg(short, long, global = true, value_parser = parse_file_arg)]
    /// A JSON file listing the elements to strip from saves. Defaults to the bundled list.
    pub config: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    /// A flag that tells the program not to strip anything from the saves.
    pub no_reduce: bool,
    #[arg(short, long, global = true)]
    /// The number of threads used to load a series. Defaults to the number of CPUs.
    pub threads: Option<usize>,
    #[arg(short, long, global = true, action = ArgAction::Count)]
    /// Increase the logging verbosity, may be repeated.
    pub verbose: u8,
}

/// The actions the program can take.
#[derive(Subcommand)]
pub enum Command {
    /// Print an overview of a single save.
    Summary {
        #[arg(value_parser = parse_file_arg)]
        /// The path to the save file.
        filename: PathBuf,
        #[arg(long, default_value_t = false)]
        /// Print the overview as JSON.
        json: bool,
    },
    /// Load every matching save in a directory and export the combined tables.
    Series {
        #[arg(value_parser = parse_dir_arg)]
        /// The directory holding the saves.
        directory: PathBuf,
        /// A regular expression the save file names have to start with.
        pattern: String,
        #[arg(short, long, default_value = ".")]
        /// The directory the CSV tables are written to.
        output: PathBuf,
    },
    /// Write a copy of a save with the configured elements stripped.
    Reduce {
        #[arg(value_parser = parse_file_arg)]
        /// The save to reduce.
        input: PathBuf,
        /// Where to write the reduced save.
        output: PathBuf,
    },
}

const ACTIONS: [&str; 3] = [
    "Print a summary of a save",
    "Export a series of saves",
    "Reduce a save",
];

impl Command {
    /// Create the object based on user input.
    pub fn get_from_user() -> Result<Self, dialoguer::Error> {
        println!("Welcome to the RimWorld history extractor!\nTab autocompletes the query and enter confirms it.");
        let action = Select::new()
            .with_prompt("What do you want to do?")
            .items(&ACTIONS)
            .default(0)
            .interact()?;
        let completion = SaveFileNameCompletion::default();
        let initial = completion.save_files.first().cloned().unwrap_or_default();
        match action {
            0 => {
                let filename = Input::<String>::new()
                    .with_prompt("Enter the save file path")
                    .validate_with(validate_file_path)
                    .with_initial_text(initial)
                    .completion_with(&completion)
                    .interact_text()?;
                Ok(Command::Summary {
                    filename: filename.into(),
                    json: false,
                })
            }
            1 => {
                let directory = Input::<String>::new()
                    .with_prompt("Enter the save directory [empty for cwd]")
                    .allow_empty(true)
                    .validate_with(|input: &String| {
                        if input.is_empty() {
                            Ok(())
                        } else {
                            validate_dir_path(input)
                        }
                    })
                    .interact_text()?;
                let pattern = Input::<String>::new()
                    .with_prompt("Enter the save file name pattern")
                    .interact_text()?;
                let output = Input::<String>::new()
                    .with_prompt("Enter the output path [empty for cwd]")
                    .allow_empty(true)
                    .interact_text()?;
                let or_cwd = |x: String| {
                    if x.is_empty() {
                        PathBuf::from(".")
                    } else {
                        PathBuf::from(x)
                    }
                };
                Ok(Command::Series {
                    directory: or_cwd(directory),
                    pattern,
                    output: or_cwd(output),
                })
            }
            _ => {
                let input = Input::<String>::new()
                    .with_prompt("Input file path")
                    .validate_with(validate_file_path)
                    .with_initial_text(initial)
                    .completion_with(&completion)
                    .interact_text()?;
                let output = Input::<String>::new()
                    .with_prompt("Output file path")
                    .interact_text()?;
                Ok(Command::Reduce {
                    input: input.into(),
                    output: output.into(),
                })
            }
        }
    }
}
