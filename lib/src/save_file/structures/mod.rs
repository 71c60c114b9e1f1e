use serde::{de::DeserializeOwned, Serialize};

use super::parser::{
    types::Tick, ElementRef, ParsingError, SearchPattern, XmlTree,
};

/// A submodule that provides the [ModRecord] object.
mod mod_info;
pub use mod_info::{extract_mods, ModRecord};

/// A submodule that provides the [PawnRecord] object.
mod pawn;
pub use pawn::{extract_pawns, mark_latest_records, PawnRecord};

/// A submodule that provides the [PlantRecord] object.
mod plant;
pub use plant::{extract_plants, GrowthBin, PlantRecord, GROWTH_BIN_COUNT};

/// A submodule that provides the [WeatherRecord] object.
mod weather;
pub use weather::{extract_weather, WeatherRecord};

/// A flat record extracted from a save.
///
/// ## Implementing Record
///
/// Every record type is a plain struct with a fixed field set, serialized
/// with serde. [Record::COLUMNS] has to list the serialized field names in
/// declaration order, the [table](super::RecordTable) conversion checks
/// headers against it. Every record carries the tick counter of the save it
/// came from, so rows from different saves can be told apart after they are
/// concatenated.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// A human readable name of the record type
    const NAME: &'static str;
    /// The column names, in serialization order
    const COLUMNS: &'static [&'static str];

    /// The tick counter of the save this record was extracted from
    fn time_ticks(&self) -> Tick;
}

const GAME_VERSION_PATTERN: &str = "./meta/gameVersion";
const TICKS_PATTERN: &str = ".//tickManager/ticksGame";

/// Text of the first match, as an owned value. Missing elements and empty
/// elements both result in None.
fn optional_text(element: ElementRef<'_>, pattern: &SearchPattern) -> Option<String> {
    element.find_text(pattern).map(str::to_owned)
}

/// Reads the game version string from the save metadata
pub fn extract_game_version(tree: &XmlTree) -> Result<String, ParsingError> {
    optional_text(tree.root(), &SearchPattern::new(GAME_VERSION_PATTERN)?)
        .ok_or(ParsingError::MissingElement(GAME_VERSION_PATTERN))
}

/// Reads the number of simulation steps the game has run for
pub fn extract_ticks(tree: &XmlTree) -> Result<Tick, ParsingError> {
    let value = tree
        .root()
        .find_text(&SearchPattern::new(TICKS_PATTERN)?)
        .ok_or(ParsingError::MissingElement(TICKS_PATTERN))?;
    value
        .trim()
        .parse()
        .map_err(|source| ParsingError::IntegerError {
            field: "ticksGame",
            value: value.to_owned(),
            source,
        })
}
