use serde::{Deserialize, Serialize};

use super::{
    super::parser::{types::Tick, ParsingError, SearchPattern, XmlTree},
    optional_text, Record,
};

const WEATHER_MANAGER_PATTERN: &str = ".//weatherManager";

/// The weather on the first map of the save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub weather_current: Option<String>,
    pub weather_current_age: Option<String>,
    pub weather_last: Option<String>,
    pub time_ticks: Tick,
}

impl Record for WeatherRecord {
    const NAME: &'static str = "weather";
    const COLUMNS: &'static [&'static str] = &[
        "weather_current",
        "weather_current_age",
        "weather_last",
        "time_ticks",
    ];

    fn time_ticks(&self) -> Tick {
        self.time_ticks
    }
}

/// Reads the weather manager of the save. There is always exactly one record.
pub fn extract_weather(tree: &XmlTree, ticks: Tick) -> Result<WeatherRecord, ParsingError> {
    let manager = tree
        .find(&SearchPattern::new(WEATHER_MANAGER_PATTERN)?)
        .ok_or(ParsingError::MissingElement(WEATHER_MANAGER_PATTERN))?;
    Ok(WeatherRecord {
        weather_current: optional_text(manager, &SearchPattern::new(".//curWeather")?),
        weather_current_age: optional_text(manager, &SearchPattern::new(".//curWeatherAge")?),
        weather_last: optional_text(manager, &SearchPattern::new(".//lastWeather")?),
        time_ticks: ticks,
    })
}
