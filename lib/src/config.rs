use std::{fs::File, io::BufReader, path::Path, str::FromStr};

use derive_more::{Display, Error, From};
use log::warn;
use serde::{Deserialize, Serialize};

use super::save_file::{parser::PatternError, parser::SearchPattern, Reduction};

/// The reduction configuration shipped with the tool
const DEFAULT_CONFIG: &str = include_str!("../defaults.json");

/// An error that can occur when loading a reduction configuration
#[derive(Debug, From, Display, Error)]
pub enum ConfigError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
    PatternError(PatternError),
}

/// The JSON document describing which elements to strip from saves.
///
/// ```json
/// {
///     "xml_elements_remove_list": [".//scenario", ".//thing[@Class='Filth']"],
///     "removal_limit": null
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReductionConfig {
    pub xml_elements_remove_list: Vec<String>,
    /// Maximum number of elements removed per pattern
    #[serde(default)]
    pub removal_limit: Option<usize>,
}

impl ReductionConfig {
    /// Reads a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Compiles every pattern of the configuration
    pub fn reduction(&self) -> Result<Reduction, ConfigError> {
        let patterns = self
            .xml_elements_remove_list
            .iter()
            .map(SearchPattern::new)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reduction::new(patterns).with_limit(self.removal_limit))
    }
}

impl FromStr for ReductionConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(serde_json::from_str(s)?)
    }
}

impl Default for ReductionConfig {
    fn default() -> Self {
        DEFAULT_CONFIG.parse().unwrap_or_else(|err| {
            warn!(
                "Bundled reduction configuration is invalid, nothing will be stripped: {}",
                err
            );
            ReductionConfig {
                xml_elements_remove_list: Vec::new(),
                removal_limit: None,
            }
        })
    }
}
