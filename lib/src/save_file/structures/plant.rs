use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    super::parser::{types::Tick, ParsingError, SearchPattern, XmlTree},
    optional_text, Record,
};

const PLANT_PATTERN: &str = ".//thing[@Class='Plant']";
const PLANT_ID_PATTERN: &str = ".//id";
const DEFINITION_PATTERN: &str = ".//def";
const MAP_PATTERN: &str = ".//map";
const POSITION_PATTERN: &str = ".//pos";
const GROWTH_PATTERN: &str = ".//growth";
const AGE_PATTERN: &str = ".//age";

/// The width of a single growth bin, in percent
const BIN_WIDTH: u8 = 5;
/// The number of growth bins covering 0 to 100 percent
pub const GROWTH_BIN_COUNT: u8 = 100 / BIN_WIDTH;

/// A five percent wide range of plant growth, identified by its upper bound.
/// The first bin also holds fully ungrown plants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrowthBin(u8);

impl GrowthBin {
    /// Finds the bin of a percentage. Values outside of 0 to 100 are clamped.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage.is_nan() || percentage <= 0.0 {
            return GrowthBin(BIN_WIDTH);
        }
        let index = (percentage.min(100.0) / BIN_WIDTH as f64).ceil() as u8;
        GrowthBin(index.clamp(1, GROWTH_BIN_COUNT) * BIN_WIDTH)
    }

    /// Inclusive upper bound of the bin
    pub fn upper_bound(&self) -> u8 {
        self.0
    }

    /// Exclusive lower bound of the bin
    pub fn lower_bound(&self) -> u8 {
        self.0 - BIN_WIDTH
    }

    /// Every bin, in ascending order
    pub fn all() -> impl Iterator<Item = GrowthBin> {
        (1..=GROWTH_BIN_COUNT).map(|i| GrowthBin(i * BIN_WIDTH))
    }
}

impl fmt::Display for GrowthBin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.lower_bound(), self.upper_bound())
    }
}

/// A plant standing on one of the maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlantRecord {
    pub plant_id: String,
    pub plant_definition: Option<String>,
    pub plant_map_id: Option<String>,
    pub plant_position: Option<String>,
    pub plant_growth: Option<String>,
    pub plant_age: Option<String>,
    pub plant_growth_percentage: Option<f64>,
    pub plant_growth_bin: Option<GrowthBin>,
    pub time_ticks: Tick,
}

impl Record for PlantRecord {
    const NAME: &'static str = "plant";
    const COLUMNS: &'static [&'static str] = &[
        "plant_id",
        "plant_definition",
        "plant_map_id",
        "plant_position",
        "plant_growth",
        "plant_age",
        "plant_growth_percentage",
        "plant_growth_bin",
        "time_ticks",
    ];

    fn time_ticks(&self) -> Tick {
        self.time_ticks
    }
}

impl PlantRecord {
    /// Fills in the growth percentage and bin from the raw growth value
    pub fn derive_growth(&mut self) -> Result<(), ParsingError> {
        let percentage = match &self.plant_growth {
            Some(growth) => {
                let growth: f64 =
                    growth
                        .trim()
                        .parse()
                        .map_err(|source| ParsingError::RealError {
                            field: "growth",
                            value: growth.clone(),
                            source,
                        })?;
                Some(growth * 100.0)
            }
            None => None,
        };
        self.plant_growth_percentage = percentage;
        self.plant_growth_bin = percentage.map(GrowthBin::from_percentage);
        Ok(())
    }
}

/// Extracts a record for every plant on every map. Growth derived fields are
/// left empty, see [PlantRecord::derive_growth].
pub fn extract_plants(tree: &XmlTree, ticks: Tick) -> Result<Vec<PlantRecord>, ParsingError> {
    let id = SearchPattern::new(PLANT_ID_PATTERN)?;
    let definition = SearchPattern::new(DEFINITION_PATTERN)?;
    let map = SearchPattern::new(MAP_PATTERN)?;
    let position = SearchPattern::new(POSITION_PATTERN)?;
    let growth = SearchPattern::new(GROWTH_PATTERN)?;
    let age = SearchPattern::new(AGE_PATTERN)?;
    tree.find_all(&SearchPattern::new(PLANT_PATTERN)?)
        .into_iter()
        .map(|plant| {
            let plant_id = plant.find_text(&id).ok_or(ParsingError::MissingIdentity {
                record: PlantRecord::NAME,
                pattern: PLANT_ID_PATTERN,
            })?;
            Ok(PlantRecord {
                plant_id: plant_id.to_owned(),
                plant_definition: optional_text(plant, &definition),
                plant_map_id: optional_text(plant, &map),
                plant_position: optional_text(plant, &position),
                plant_growth: optional_text(plant, &growth),
                plant_age: optional_text(plant, &age),
                plant_growth_percentage: None,
                plant_growth_bin: None,
                time_ticks: ticks,
            })
        })
        .collect()
}
