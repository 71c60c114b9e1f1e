use clap::Parser;
use derive_more::{Display, Error, From};
use env_logger::Env;
use human_panic::setup_panic;
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, warn};
use serde_json::json;
use std::{
    io::{stdin, IsTerminal},
    path::Path,
    process::ExitCode,
    time::{Duration, Instant},
};

use rimworld_history_lib::{
    config::{ConfigError, ReductionConfig},
    save_file::{process_save_file, LoadError, LoadOptions, Save},
    series::{SaveSeries, SeriesError},
};

/// A submodule for handling the command line arguments
mod args;
use args::{Args, Command};

/// An error that ends the program
#[derive(Debug, From, Display, Error)]
enum CliError {
    #[display("failed to read the configuration: {_0}")]
    ConfigError(ConfigError),
    LoadError(LoadError),
    SeriesError(SeriesError),
    #[display("failed to read user input: {_0}")]
    PromptError(dialoguer::Error),
    JsonError(serde_json::Error),
    #[display("no command provided, see --help")]
    NoCommand,
}

/// Initializes the logger, the more verbose flags the more is logged. The
/// `RUST_LOG` environment variable takes precedence.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::init_from_env(Env::default().default_filter_or(level));
}

/// Builds the loading options out of the command line flags
fn load_options(
    config: Option<&Path>,
    no_reduce: bool,
    threads: Option<usize>,
) -> Result<LoadOptions, ConfigError> {
    let reduction = if no_reduce {
        None
    } else {
        let config = match config {
            Some(path) => ReductionConfig::load(path)?,
            None => ReductionConfig::default(),
        };
        info!(
            "Stripping {} element patterns from saves",
            config.xml_elements_remove_list.len()
        );
        Some(config.reduction()?)
    };
    Ok(LoadOptions {
        reduction,
        preserve_tree: false,
        threads,
    })
}

fn spinner(message: &'static str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("[{elapsed_precise}] {spinner} {pos} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(200));
    spinner
}

fn summary(filename: &Path, json: bool, options: &LoadOptions) -> Result<(), CliError> {
    let progress = spinner("Parsing save");
    let save = Save::load(filename, options)?;
    progress.finish_and_clear();
    if json {
        let summary = json!({
            "file_name": save.file_name(),
            "game_version": save.game_version(),
            "size": save.size(),
            "ticks": save.ticks(),
            "removed_elements": save.removed_elements(),
            "mods": save.mods().iter().map(|m| &m.mod_id).collect::<Vec<_>>(),
            "pawn_records": save.pawns().len(),
            "plants": save.plants().len(),
            "weather": save.weather().rows().first().and_then(|w| w.weather_current.clone()),
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }
    println!("Save: {}", save.file_name());
    println!("Game version: {}", save.game_version());
    println!("Size: {} bytes", save.size());
    println!("Ticks: {}", save.ticks());
    if save.removed_elements() > 0 {
        println!("Removed elements: {}", save.removed_elements());
    }
    println!(
        "Tables: {} mods, {} pawn records, {} plants, {} weather",
        save.mods().len(),
        save.pawns().len(),
        save.plants().len(),
        save.weather().len()
    );
    for record in save.mods() {
        println!(
            "  {} ({})",
            record.mod_name.as_deref().unwrap_or(&record.mod_id),
            record.mod_id
        );
    }
    Ok(())
}

fn series(
    directory: &Path,
    pattern: &str,
    output: &Path,
    options: &LoadOptions,
) -> Result<(), CliError> {
    let progress = spinner("");
    let series = SaveSeries::load_with_progress(directory, pattern, options, &|name: &str| {
        progress.inc(1);
        progress.set_message(name.to_owned());
    })?;
    progress.finish_with_message("Saves loaded");
    if let Some(latest) = series.latest_save() {
        println!(
            "Latest save: {} at tick {}",
            latest.file_name(),
            latest.ticks()
        );
    }
    println!(
        "{} saves: {} mods, {} pawn records, {} plants, {} weather",
        series.len(),
        series.mods().len(),
        series.pawns().len(),
        series.plants().len(),
        series.weather().len()
    );
    for path in series.export_csv(output)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn reduce(input: &Path, output: &Path, options: &LoadOptions) -> Result<(), CliError> {
    let reduction = match &options.reduction {
        Some(reduction) => reduction.clone(),
        None => {
            warn!("Reduction disabled, the save is copied as is");
            Default::default()
        }
    };
    let progress = spinner("Reducing save");
    let report = process_save_file(input, output, &reduction)?;
    progress.finish_and_clear();
    println!(
        "Removed {} elements, file size reduced by {} bytes ({:.2}%)",
        report.removed_elements,
        report.size_difference(),
        report.size_difference_percent()
    );
    Ok(())
}

fn run(args: Args) -> Result<(), CliError> {
    let command = match args.command {
        Some(command) => command,
        None if stdin().is_terminal() => Command::get_from_user()?,
        None => return Err(CliError::NoCommand),
    };
    let options = load_options(args.config.as_deref(), args.no_reduce, args.threads)?;
    let start = Instant::now();
    match command {
        Command::Summary { filename, json } => summary(&filename, json, &options)?,
        Command::Series {
            directory,
            pattern,
            output,
        } => series(&directory, &pattern, &output, &options)?,
        Command::Reduce { input, output } => reduce(&input, &output, &options)?,
    }
    info!("Done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

/// Main function. This is the entry point of the program.
///
/// # Process
///
/// 1. Reads the command from the arguments, or asks the user for it
/// 2. Builds the [LoadOptions] out of the reduction configuration
/// 3. Runs the command:
///     - `summary` loads a single [Save] and prints an overview of it
///     - `series` loads a [SaveSeries] and exports its tables as CSV
///     - `reduce` writes a stripped copy of a save
fn main() -> ExitCode {
    setup_panic!();
    let args = Args::parse();
    init_logging(args.verbose);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}
