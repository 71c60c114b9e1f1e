use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{
    super::parser::{
        types::{TaleDate, Tick},
        ParsingError, SearchPattern, XmlTree,
    },
    optional_text, Record,
};

const TALE_PATTERN: &str = ".//li[@Class='Tale_SinglePawn']";
const PAWN_ID_PATTERN: &str = ".//pawnData/pawn";
const FIRST_NAME_PATTERN: &str = ".//pawnData/name/first";
const NICK_NAME_PATTERN: &str = ".//pawnData/name/nick";
const LAST_NAME_PATTERN: &str = ".//pawnData/name/last";
const AGE_PATTERN: &str = ".//pawnData/age";
const CHRONOLOGICAL_AGE_PATTERN: &str = ".//pawnData/chronologicalAge";
const TEMPERATURE_PATTERN: &str = ".//surroundings/temperature";
const DATE_PATTERN: &str = ".//date";

/// Pawns whose identity starts with this are human
const HUMANOID_PREFIX: &str = "Thing_Human";

/// A snapshot of a pawn, taken from a single pawn tale.
/// The same pawn usually appears in many tales, [PawnRecord::latest_record]
/// marks the most recent ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PawnRecord {
    pub pawn_id: String,
    pub pawn_name_first: Option<String>,
    pub pawn_name_nick: Option<String>,
    pub pawn_name_last: Option<String>,
    pub pawn_name_full: Option<String>,
    pub pawn_biological_age: Option<String>,
    pub pawn_chronological_age: Option<String>,
    pub pawn_ambient_temperature: Option<String>,
    pub pawn_tale_date: Option<TaleDate>,
    pub pawn_is_humanoid: bool,
    pub latest_record: bool,
    pub time_ticks: Tick,
}

impl Record for PawnRecord {
    const NAME: &'static str = "pawn";
    const COLUMNS: &'static [&'static str] = &[
        "pawn_id",
        "pawn_name_first",
        "pawn_name_nick",
        "pawn_name_last",
        "pawn_name_full",
        "pawn_biological_age",
        "pawn_chronological_age",
        "pawn_ambient_temperature",
        "pawn_tale_date",
        "pawn_is_humanoid",
        "latest_record",
        "time_ticks",
    ];

    fn time_ticks(&self) -> Tick {
        self.time_ticks
    }
}

impl PawnRecord {
    /// The position of this record in time, first by save then by tale
    fn recency(&self) -> (Tick, Option<TaleDate>) {
        (self.time_ticks, self.pawn_tale_date)
    }
}

/// Composes `first "nick" last` out of whichever parts are present
fn full_name(first: Option<&str>, nick: Option<&str>, last: Option<&str>) -> Option<String> {
    let nick = nick.map(|nick| format!("\"{}\"", nick));
    let parts: Vec<&str> = [first, nick.as_deref(), last].into_iter().flatten().collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(" "))
    }
}

/// Extracts a record from every single pawn tale in the save.
/// The `latest_record` flag is left unset, see [mark_latest_records].
pub fn extract_pawns(tree: &XmlTree, ticks: Tick) -> Result<Vec<PawnRecord>, ParsingError> {
    let pawn_id = SearchPattern::new(PAWN_ID_PATTERN)?;
    let first = SearchPattern::new(FIRST_NAME_PATTERN)?;
    let nick = SearchPattern::new(NICK_NAME_PATTERN)?;
    let last = SearchPattern::new(LAST_NAME_PATTERN)?;
    let age = SearchPattern::new(AGE_PATTERN)?;
    let chronological_age = SearchPattern::new(CHRONOLOGICAL_AGE_PATTERN)?;
    let temperature = SearchPattern::new(TEMPERATURE_PATTERN)?;
    let date = SearchPattern::new(DATE_PATTERN)?;
    let mut records = Vec::new();
    for tale in tree.find_all(&SearchPattern::new(TALE_PATTERN)?) {
        let id = tale
            .find_text(&pawn_id)
            .ok_or(ParsingError::MissingIdentity {
                record: PawnRecord::NAME,
                pattern: PAWN_ID_PATTERN,
            })?;
        let tale_date = match tale.find_text(&date) {
            Some(value) => Some(value.trim().parse().map_err(|source| {
                ParsingError::IntegerError {
                    field: "date",
                    value: value.to_owned(),
                    source,
                }
            })?),
            None => None,
        };
        let name_first = optional_text(tale, &first);
        let name_nick = optional_text(tale, &nick);
        let name_last = optional_text(tale, &last);
        records.push(PawnRecord {
            pawn_id: id.to_owned(),
            pawn_name_full: full_name(
                name_first.as_deref(),
                name_nick.as_deref(),
                name_last.as_deref(),
            ),
            pawn_name_first: name_first,
            pawn_name_nick: name_nick,
            pawn_name_last: name_last,
            pawn_biological_age: optional_text(tale, &age),
            pawn_chronological_age: optional_text(tale, &chronological_age),
            pawn_ambient_temperature: optional_text(tale, &temperature),
            pawn_tale_date: tale_date,
            pawn_is_humanoid: id.starts_with(HUMANOID_PREFIX),
            latest_record: false,
            time_ticks: ticks,
        });
    }
    Ok(records)
}

/// Sets `latest_record` on the most recent records of every pawn and clears
/// it everywhere else.
///
/// Records are ordered by the save they come from and then by the tale date,
/// a record without a date is older than any dated one. Ties are not broken,
/// every record sharing the maximum is marked.
pub fn mark_latest_records(records: &mut [PawnRecord]) {
    let mut latest: HashMap<String, (Tick, Option<TaleDate>)> = HashMap::new();
    for record in records.iter() {
        let recency = record.recency();
        latest
            .entry(record.pawn_id.clone())
            .and_modify(|current| {
                if recency > *current {
                    *current = recency;
                }
            })
            .or_insert(recency);
    }
    for record in records.iter_mut() {
        record.latest_record = latest.get(&record.pawn_id) == Some(&record.recency());
    }
}

#[cfg(test)]
mod tests {
    use super::super::super::test_fixtures::FixtureSave;
    use super::*;

    fn fixture_pawns() -> Vec<PawnRecord> {
        let tree = XmlTree::parse_str(&FixtureSave::default().to_xml()).unwrap();
        extract_pawns(&tree, 41164371).unwrap()
    }

    #[test]
    fn test_extract_pawns() {
        let pawns = fixture_pawns();
        // the double pawn tale is not counted
        assert_eq!(pawns.len(), 5);
        let ada = &pawns[0];
        assert_eq!(ada.pawn_id, "Thing_Human101");
        assert_eq!(ada.pawn_name_full.as_deref(), Some("Ada \"Addy\" Lovelace"));
        assert_eq!(ada.pawn_biological_age.as_deref(), Some("25"));
        assert_eq!(ada.pawn_chronological_age.as_deref(), Some("310"));
        assert_eq!(ada.pawn_ambient_temperature.as_deref(), Some("21.5"));
        assert_eq!(ada.pawn_tale_date, Some(1000));
        assert!(ada.pawn_is_humanoid);
        assert!(!ada.latest_record);
        assert_eq!(pawns[2].pawn_ambient_temperature, None);
    }

    #[test]
    fn test_animal() {
        let pawns = fixture_pawns();
        let animal = &pawns[3];
        assert_eq!(animal.pawn_id, "Thing_Muffalo303");
        assert!(!animal.pawn_is_humanoid);
        assert_eq!(animal.pawn_name_first, None);
        assert_eq!(animal.pawn_name_full, None);
        assert_eq!(animal.pawn_chronological_age, None);
    }

    #[test]
    fn test_full_name() {
        assert_eq!(
            full_name(Some("Ada"), None, Some("Lovelace")).as_deref(),
            Some("Ada Lovelace")
        );
        assert_eq!(full_name(None, Some("Addy"), None).as_deref(), Some("\"Addy\""));
        assert_eq!(full_name(None, None, None), None);
    }

    #[test]
    fn test_latest_records() {
        let mut pawns = fixture_pawns();
        mark_latest_records(&mut pawns);
        let latest: Vec<bool> = pawns.iter().map(|p| p.latest_record).collect();
        // both tales of Thing_Human202 share the same date
        assert_eq!(latest, vec![false, true, true, true, true]);
        for pawn in &pawns {
            let max = pawns
                .iter()
                .filter(|p| p.pawn_id == pawn.pawn_id)
                .map(|p| p.pawn_tale_date)
                .max()
                .unwrap();
            assert_eq!(pawn.latest_record, pawn.pawn_tale_date == max);
        }
    }

    #[test]
    fn test_latest_records_across_saves() {
        let mut pawns = fixture_pawns();
        let mut later = fixture_pawns();
        for pawn in later.iter_mut() {
            pawn.time_ticks += 60000;
        }
        // an older tale in a newer save still wins
        later[1].pawn_tale_date = Some(10);
        pawns.extend(later);
        mark_latest_records(&mut pawns);
        assert!(pawns[..5].iter().all(|p| !p.latest_record));
        assert!(pawns[5..].iter().filter(|p| p.latest_record).count() == 4);
        assert!(pawns[5].latest_record);
    }

    #[test]
    fn test_missing_identity() {
        let tree = XmlTree::parse_str(
            "<savegame><tales>
                <li Class=\"Tale_SinglePawn\"><pawnData><age>3</age></pawnData></li>
            </tales></savegame>",
        )
        .unwrap();
        assert!(matches!(
            extract_pawns(&tree, 0),
            Err(ParsingError::MissingIdentity {
                record: "pawn",
                ..
            })
        ));
    }

    #[test]
    fn test_bad_date() {
        let tree = XmlTree::parse_str(
            "<savegame><li Class=\"Tale_SinglePawn\">
                <pawnData><pawn>Thing_Human1</pawn></pawnData><date>yesterday</date>
            </li></savegame>",
        )
        .unwrap();
        assert!(matches!(
            extract_pawns(&tree, 0),
            Err(ParsingError::IntegerError { field: "date", .. })
        ));
    }
}
