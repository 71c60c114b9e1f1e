use serde::{Deserialize, Serialize};

use super::{
    super::parser::{types::Tick, ElementRef, ParsingError, SearchPattern, XmlTree},
    Record,
};

const MOD_IDS_PATTERN: &str = "./meta/modIds/li";
const MOD_STEAM_IDS_PATTERN: &str = "./meta/modSteamIds/li";
const MOD_NAMES_PATTERN: &str = "./meta/modNames/li";

/// A mod that was active when the save was written
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModRecord {
    pub mod_id: String,
    pub mod_name: Option<String>,
    pub mod_steam_id: Option<String>,
    pub time_ticks: Tick,
}

impl Record for ModRecord {
    const NAME: &'static str = "mod";
    const COLUMNS: &'static [&'static str] = &["mod_id", "mod_name", "mod_steam_id", "time_ticks"];

    fn time_ticks(&self) -> Tick {
        self.time_ticks
    }
}

fn list<'a>(tree: &'a XmlTree, pattern: &str) -> Result<Vec<ElementRef<'a>>, ParsingError> {
    Ok(tree.find_all(&SearchPattern::new(pattern)?))
}

/// Zips the three parallel mod lists in the save metadata into records.
/// The lists are positional, so they have to be of the same length.
pub fn extract_mods(tree: &XmlTree, ticks: Tick) -> Result<Vec<ModRecord>, ParsingError> {
    let ids = list(tree, MOD_IDS_PATTERN)?;
    let steam_ids = list(tree, MOD_STEAM_IDS_PATTERN)?;
    let names = list(tree, MOD_NAMES_PATTERN)?;
    if ids.len() != steam_ids.len() || ids.len() != names.len() {
        return Err(ParsingError::MismatchedModLists {
            ids: ids.len(),
            steam_ids: steam_ids.len(),
            names: names.len(),
        });
    }
    ids.iter()
        .zip(steam_ids.iter().zip(names.iter()))
        .map(|(id, (steam_id, name))| {
            let mod_id = id.text().ok_or(ParsingError::MissingIdentity {
                record: ModRecord::NAME,
                pattern: MOD_IDS_PATTERN,
            })?;
            Ok(ModRecord {
                mod_id: mod_id.to_owned(),
                mod_name: name.text().map(str::to_owned),
                mod_steam_id: steam_id.text().map(str::to_owned),
                time_ticks: ticks,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::super::super::test_fixtures::FixtureSave;
    use super::*;

    #[test]
    fn test_extract_mods() {
        let tree = XmlTree::parse_str(&FixtureSave::default().to_xml()).unwrap();
        let mods = extract_mods(&tree, 41164371).unwrap();
        assert_eq!(mods.len(), 3);
        assert_eq!(mods[0].mod_id, "ludeon.rimworld");
        assert_eq!(mods[0].mod_name.as_deref(), Some("Core"));
        assert_eq!(mods[2].mod_steam_id.as_deref(), Some("818773962"));
        assert!(mods.iter().all(|m| m.time_ticks == 41164371));
    }

    #[test]
    fn test_mismatched_lists() {
        let tree = XmlTree::parse_str(
            "<savegame><meta>
                <modIds><li>a</li><li>b</li></modIds>
                <modSteamIds><li>0</li></modSteamIds>
                <modNames><li>A</li><li>B</li></modNames>
            </meta></savegame>",
        )
        .unwrap();
        assert!(matches!(
            extract_mods(&tree, 0),
            Err(ParsingError::MismatchedModLists {
                ids: 2,
                steam_ids: 1,
                names: 2
            })
        ));
    }

    #[test]
    fn test_no_mods() {
        let tree = XmlTree::parse_str("<savegame><meta/></savegame>").unwrap();
        assert!(extract_mods(&tree, 0).unwrap().is_empty());
    }

    #[test]
    fn test_empty_entries() {
        let tree = XmlTree::parse_str(
            "<savegame><meta>
                <modIds><li>a</li></modIds>
                <modSteamIds><li/></modSteamIds>
                <modNames><li></li></modNames>
            </meta></savegame>",
        )
        .unwrap();
        let mods = extract_mods(&tree, 7).unwrap();
        assert_eq!(mods[0].mod_name, None);
        assert_eq!(mods[0].mod_steam_id, None);
    }
}
