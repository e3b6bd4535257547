use std::{
    collections::{BTreeMap, HashMap},
    path::Path,
};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::config::{ForecastProviderKind, Lang};

/// Number of moon icons; phases are snapped to the nearest `1 / MOON_STEPS`.
pub const MOON_STEPS: u8 = 16;

/// Read-only lookup from provider weather codes and snapped moon phases to
/// local assets and labels. Built once at startup.
#[derive(Debug, Clone, Default)]
pub struct IconMapping {
    weather: HashMap<String, String>,
    /// Keyed by phase in sixteenths, `0..=16`.
    moon: BTreeMap<u8, String>,
}

/// On-disk override format. Moon keys are snapped phases written as
/// decimals (`"0"`, `"0.0625"`, … `"1"`).
#[derive(Debug, Default, Deserialize)]
struct MappingFile {
    #[serde(default)]
    weather: HashMap<String, String>,
    #[serde(default)]
    moon: HashMap<String, String>,
}

impl IconMapping {
    pub fn builtin(provider: ForecastProviderKind, lang: Lang) -> Self {
        let weather = match provider {
            ForecastProviderKind::DarkSky => [
                ("clear-day", "sun"),
                ("clear-night", "moon"),
                ("rain", "rain"),
                ("snow", "snow"),
                ("sleet", "sleet"),
                ("wind", "wind"),
                ("fog", "fog"),
                ("cloudy", "cloud"),
                ("partly-cloudy-day", "cloud-sun"),
                ("partly-cloudy-night", "cloud-moon"),
            ]
            .into_iter()
            .map(|(code, asset)| (code.to_owned(), asset.to_owned()))
            .collect(),
            // Weatherbit icon codes double as asset names.
            ForecastProviderKind::Weatherbit => HashMap::new(),
        };

        let moon = (0..=MOON_STEPS)
            .map(|step| (step, moon_phase_name(step, lang).to_owned()))
            .collect();

        Self { weather, moon }
    }

    /// Built-in tables, overridden entry by entry from `path` if given.
    pub fn load(path: Option<&Path>, provider: ForecastProviderKind, lang: Lang) -> Result<Self> {
        let mut mapping = Self::builtin(provider, lang);
        if let Some(path) = path {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read icon mapping {}", path.display()))?;
            mapping
                .merge_json(&raw)
                .with_context(|| format!("Invalid icon mapping {}", path.display()))?;
            info!(path = %path.display(), "Icon mapping overrides loaded");
        }
        Ok(mapping)
    }

    fn merge_json(&mut self, raw: &str) -> Result<()> {
        let file: MappingFile = serde_json::from_str(raw)?;
        self.weather.extend(file.weather);
        for (key, label) in file.moon {
            let phase: f64 = key
                .parse()
                .with_context(|| format!("moon key {key:?} is not a number"))?;
            if !(0.0..=1.0).contains(&phase) {
                anyhow::bail!("moon key {key:?} is outside 0..=1");
            }
            self.moon.insert(moon_step(phase), label);
        }
        Ok(())
    }

    /// Asset for a provider weather code; unknown codes map to themselves.
    pub fn weather_asset<'a>(&'a self, code: &'a str) -> &'a str {
        self.weather.get(code).map(String::as_str).unwrap_or(code)
    }

    pub fn moon_label(&self, step: u8) -> Option<&str> {
        self.moon.get(&step).map(String::as_str)
    }
}

/// Snap a lunation fraction to the nearest sixteenth, as a step `0..=16`.
pub fn moon_step(phase: f64) -> u8 {
    (phase.clamp(0.0, 1.0) * f64::from(MOON_STEPS)).round() as u8
}

fn moon_phase_name(step: u8, lang: Lang) -> &'static str {
    let idx = match step {
        0 | 16 => 0,
        1..=3 => 1,
        4 => 2,
        5..=7 => 3,
        8 => 4,
        9..=11 => 5,
        12 => 6,
        _ => 7,
    };
    match lang {
        Lang::De => [
            "Neumond",
            "Zunehmende Sichel",
            "Erstes Viertel",
            "Zunehmender Mond",
            "Vollmond",
            "Abnehmender Mond",
            "Letztes Viertel",
            "Abnehmende Sichel",
        ][idx],
        Lang::En => [
            "New moon",
            "Waxing crescent",
            "First quarter",
            "Waxing gibbous",
            "Full moon",
            "Waning gibbous",
            "Last quarter",
            "Waning crescent",
        ][idx],
    }
}
