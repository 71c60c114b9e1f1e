//! Generated save documents for tests.

use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};

use flate2::{write::GzEncoder, Compression};

use super::parser::types::{TaleDate, Tick};

pub(crate) struct FixtureTale {
    pub pawn: Option<&'static str>,
    pub name: (Option<&'static str>, Option<&'static str>, Option<&'static str>),
    pub age: Option<&'static str>,
    pub chronological_age: Option<&'static str>,
    pub temperature: Option<&'static str>,
    pub date: Option<TaleDate>,
}

pub(crate) struct FixturePlant {
    pub id: String,
    pub def: &'static str,
    pub growth: Option<String>,
    pub age: Option<String>,
}

pub(crate) struct FixtureSave {
    pub game_version: &'static str,
    pub ticks: Tick,
    pub mods: Vec<(&'static str, &'static str, &'static str)>,
    pub tales: Vec<FixtureTale>,
    pub plants: Vec<FixturePlant>,
}

fn element(out: &mut String, tag: &str, value: Option<&str>) {
    if let Some(value) = value {
        out.push_str(&format!("<{tag}>{value}</{tag}>"));
    }
}

fn plant(index: usize, def: &'static str, growth: Option<&str>, age: Option<&str>) -> FixturePlant {
    FixturePlant {
        id: format!("{}{}", def, index),
        def,
        growth: growth.map(str::to_owned),
        age: age.map(str::to_owned),
    }
}

impl Default for FixtureSave {
    /// Three mods, five single pawn tales about three pawns and six plants
    fn default() -> Self {
        let human = |pawn, name, date, temperature| FixtureTale {
            pawn: Some(pawn),
            name,
            age: Some("25"),
            chronological_age: Some("310"),
            temperature,
            date: Some(date),
        };
        let ada = (Some("Ada"), Some("Addy"), Some("Lovelace"));
        let grace = (Some("Grace"), Some("Amazing"), Some("Hopper"));
        FixtureSave {
            game_version: "1.4.3704 rev1033",
            ticks: 41164371,
            mods: vec![
                ("ludeon.rimworld", "0", "Core"),
                ("ludeon.rimworld.royalty", "0", "Royalty"),
                ("unlimitedhugs.hugslib", "818773962", "HugsLib"),
            ],
            tales: vec![
                human("Thing_Human101", ada, 1000, Some("21.5")),
                human("Thing_Human101", ada, 5000, Some("-3.2")),
                human("Thing_Human202", grace, 2000, None),
                FixtureTale {
                    pawn: Some("Thing_Muffalo303"),
                    name: (None, None, None),
                    age: Some("4"),
                    chronological_age: None,
                    temperature: Some("15"),
                    date: Some(3000),
                },
                human("Thing_Human202", grace, 2000, Some("18")),
            ],
            plants: vec![
                plant(1, "Plant_Grass", Some("0"), Some("100")),
                plant(2, "Plant_Grass", Some("0.25"), Some("200")),
                plant(3, "Plant_TreeOak", Some("0.5"), Some("300")),
                plant(4, "Plant_Potato", Some("1"), None),
                plant(5, "Plant_Grass", None, Some("50")),
                plant(6, "Plant_Berry", Some("0.049"), Some("10")),
            ],
        }
    }
}

impl FixtureSave {
    /// Replace the plants with `count` generated ones
    pub fn with_plant_count(mut self, count: usize) -> Self {
        self.plants = (0..count)
            .map(|i| {
                let growth = format!("{}", (i % 21) as f64 / 20.0);
                let age = format!("{}", i * 10);
                plant(
                    i,
                    "Plant_Grass",
                    Some(growth.as_str()),
                    if i % 7 == 6 { None } else { Some(age.as_str()) },
                )
            })
            .collect();
        self
    }

    pub fn with_ticks(mut self, ticks: Tick) -> Self {
        self.ticks = ticks;
        self
    }

    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<savegame>");
        out.push_str("<meta>");
        element(&mut out, "gameVersion", Some(self.game_version));
        for (tag, index) in [("modIds", 0), ("modSteamIds", 1), ("modNames", 2)] {
            out.push_str(&format!("<{tag}>"));
            for m in &self.mods {
                let value = [m.0, m.1, m.2][index];
                element(&mut out, "li", Some(value));
            }
            out.push_str(&format!("</{tag}>"));
        }
        out.push_str("</meta><game>");
        out.push_str(&format!(
            "<tickManager><ticksGame>{}</ticksGame><gameStartAbsTick>0</gameStartAbsTick></tickManager>",
            self.ticks
        ));
        out.push_str(
            "<scenario><name>Crashlanded</name><parts><li Class=\"ScenPart_PlayerFaction\"><def>PlayerFaction</def></li></parts></scenario>",
        );
        out.push_str("<taleManager><tales>");
        for (index, tale) in self.tales.iter().enumerate() {
            out.push_str("<li Class=\"Tale_SinglePawn\">");
            element(&mut out, "def", Some("Captured"));
            element(&mut out, "id", Some(index.to_string().as_str()));
            out.push_str("<pawnData>");
            element(&mut out, "pawn", tale.pawn);
            let (first, nick, last) = tale.name;
            if first.is_some() || nick.is_some() || last.is_some() {
                out.push_str("<name Class=\"NameTriple\">");
                element(&mut out, "first", first);
                element(&mut out, "nick", nick);
                element(&mut out, "last", last);
                out.push_str("</name>");
            } else {
                out.push_str("<name Class=\"NameSingle\"><name>Bessie</name></name>");
            }
            element(&mut out, "age", tale.age);
            element(&mut out, "chronologicalAge", tale.chronological_age);
            out.push_str("</pawnData>");
            element(&mut out, "date", tale.date.map(|d| d.to_string()).as_deref());
            if let Some(temperature) = tale.temperature {
                out.push_str("<surroundings>");
                element(&mut out, "temperature", Some(temperature));
                out.push_str("</surroundings>");
            }
            out.push_str("</li>");
        }
        out.push_str(
            "<li Class=\"Tale_DoublePawn\"><pawnData><pawn>Thing_Human101</pawn></pawnData><date>4000</date></li>",
        );
        out.push_str("</tales></taleManager>");
        out.push_str("<maps><li><uniqueID>0</uniqueID>");
        out.push_str("<pathGrid><li>1</li><li>2</li><li>3</li></pathGrid>");
        out.push_str("<things>");
        out.push_str(
            "<thing Class=\"Pawn\"><def>Human</def><id>Thing_Human101</id><map>0</map><pos>(1, 0, 1)</pos><age>25</age></thing>",
        );
        for (index, plant) in self.plants.iter().enumerate() {
            out.push_str("<thing Class=\"Plant\">");
            element(&mut out, "def", Some(plant.def));
            element(&mut out, "id", Some(plant.id.as_str()));
            element(&mut out, "map", Some("0"));
            let position = format!("({}, 0, {})", index % 250, index / 250);
            element(&mut out, "pos", Some(position.as_str()));
            element(&mut out, "growth", plant.growth.as_deref());
            element(&mut out, "age", plant.age.as_deref());
            out.push_str("</thing>");
        }
        out.push_str("<thing Class=\"Filth\"><def>Filth_Dirt</def><id>Filth_Dirt9</id></thing>");
        out.push_str("</things>");
        out.push_str(
            "<weatherManager><curWeather>Clear</curWeather><curWeatherAge>1500</curWeatherAge><lastWeather>Rain</lastWeather></weatherManager>",
        );
        out.push_str("</li></maps></game></savegame>");
        out
    }

    /// Writes the document into the directory. Names ending in `.gz` are
    /// compressed.
    pub fn write_to<P: AsRef<Path>>(&self, dir: P, name: &str) -> PathBuf {
        let path = dir.as_ref().join(name);
        let file = File::create(&path).unwrap();
        if name.ends_with(".gz") {
            let mut encoder = GzEncoder::new(file, Compression::default());
            encoder.write_all(self.to_xml().as_bytes()).unwrap();
            encoder.finish().unwrap();
        } else {
            let mut file = file;
            file.write_all(self.to_xml().as_bytes()).unwrap();
        }
        path
    }
}
