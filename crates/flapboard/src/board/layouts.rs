//! Per-record layouts.
//!
//! Each function here pairs a fixed background with the text windows for
//! one record kind and renders it. Missing fields arrive as empty strings
//! and render as blank windows.

use super::charset::{APOSTROPHE_TILE, COMMA_TILE};
use super::template::{Anchor, Background, Template};
use super::DisplayMatrix;
use crate::records::{Birthday, EmployeeRecognition, PrivatePilot, WeatherReport};

const APOSTROPHE: &[(char, u8)] = &[('\'', APOSTROPHE_TILE)];
const COMMA: &[(char, u8)] = &[(',', COMMA_TILE)];

const BIRTHDAY_BG: [&str; 6] = [
    "RRRRRRRRRRRRRRRRRRRRRR",
    "R....................R",
    "R....................R",
    "R....................R",
    "R....................R",
    "RRRRRRRRRRRRRRRRRRRRRR",
];

const RECOGNITION_BG: [&str; 6] = [
    ".R.B.R..............RB",
    "..BRB...............RB",
    "BBRWRBB.............RB",
    "..BRB...............RB",
    ".R.B.R..............RB",
    "....................RB",
];

const PILOT_BG: [&str; 6] = [
    "BBBBBBBBBBBBBBBBBBBBBB",
    "RRRR..............RRRR",
    ".RRR..............RRR.",
    "..RR..............RR..",
    "...R.............R....",
    "....BBBBBBBBBBBBBB....",
];

const CLEAR_BG: [&str; 6] = [
    "....YYYYYY............",
    "..YYYOOOOYYY..........",
    ".YYOOORROOOYY.........",
    "YYOORRRRRROOYY........",
    "......................",
    "......................",
];

const CLOUDS_BG: [&str; 6] = [
    "........WWWW..........",
    ".......WWWWWW..WWWWW..",
    "..............WWWWWWW.",
    ".......WWWWWWW........",
    "......WWWWWWWWW..WWWW.",
    "................WWWWWW",
];

/// Birthday card: red border, four centered lines in the interior.
#[must_use]
pub fn birthday(record: &Birthday) -> DisplayMatrix {
    Template::new(Background::from_pattern(BIRTHDAY_BG))
        .text(Anchor::center(1, 1, 20), "HAPPY BIRTHDAY")
        .text(Anchor::center(2, 1, 20), &record.first_name)
        .text(Anchor::center(3, 1, 20), "LETS CELEBRATE!")
        .text(Anchor::center(4, 1, 20), &record.date)
        .render()
}

/// Employee recognition: flag motif on the left, band on the right.
#[must_use]
pub fn recognition(record: &EmployeeRecognition) -> DisplayMatrix {
    Template::new(Background::from_pattern(RECOGNITION_BG))
        .text(Anchor::left(0, 7, 12), "RECOGNIZE")
        .text(Anchor::left(1, 7, 12), &record.first_name)
        .text(Anchor::center(2, 7, 12), &record.last_name)
        .text(Anchor::left(3, 7, 12), "FOR ALWAYS")
        .text(Anchor::left(4, 7, 12), "GOING THE")
        .text(Anchor::left(5, 7, 12), "EXTRA MILE")
        .render()
}

/// Newest private pilot announcement.
#[must_use]
pub fn private_pilot(record: &PrivatePilot) -> DisplayMatrix {
    Template::new(Background::from_pattern(PILOT_BG))
        .text(Anchor::center(1, 4, 14), &record.name)
        .text_with(Anchor::center(2, 4, 14), "VBT'S", APOSTROPHE)
        .text(Anchor::center(3, 4, 14), "NEWEST")
        .text(Anchor::center(4, 4, 14), "PRIVATE PILOT")
        .render()
}

/// Weather layout variants, chosen from the reported condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherTemplate {
    /// Sun art.
    Clear,
    /// Cloud art.
    Clouds,
    /// Cloud art with a rain caption.
    Rain,
    /// Text only.
    Default,
}

impl WeatherTemplate {
    /// Pick a template by keyword match on the condition.
    #[must_use]
    pub fn from_condition(condition: &str) -> Self {
        let condition = condition.to_lowercase();
        if condition.contains("clear") {
            Self::Clear
        } else if condition.contains("cloud") {
            Self::Clouds
        } else if condition.contains("rain") {
            Self::Rain
        } else {
            Self::Default
        }
    }
}

/// Current conditions, laid out by [`WeatherTemplate::from_condition`].
#[must_use]
pub fn weather(report: &WeatherReport) -> DisplayMatrix {
    let temperature = report.temperature.to_string();
    let wind = report.wind.to_string();
    match WeatherTemplate::from_condition(&report.condition) {
        WeatherTemplate::Clear => Template::new(Background::from_pattern(CLEAR_BG))
            .text(Anchor::left(1, 15, 5), "SUNNY")
            .text(Anchor::right(2, 14, 3), &temperature)
            .text(Anchor::left(2, 17, 3), "DEG")
            .text(Anchor::right(3, 14, 3), &wind)
            .text(Anchor::left(3, 17, 3), "MPH")
            .text(Anchor::left(4, 4, 14), "WELCOME TO VBT")
            .text_with(Anchor::left(5, 4, 14), "BENTONVILLE,AR", COMMA)
            .render(),
        template @ (WeatherTemplate::Clouds | WeatherTemplate::Rain) => {
            let caption = if template == WeatherTemplate::Rain {
                "RAINY"
            } else {
                "CLOUDY"
            };
            Template::new(Background::from_pattern(CLOUDS_BG))
                .text(Anchor::left(1, 0, 6), caption)
                .text(Anchor::right(2, 0, 3), &temperature)
                .text(Anchor::left(2, 3, 3), "DEG")
                .text(Anchor::right(3, 0, 3), &wind)
                .text(Anchor::left(3, 3, 3), "MPH")
                .text(Anchor::left(4, 0, 4), "KVBT")
                .render()
        }
        WeatherTemplate::Default => Template::default()
            .text(Anchor::left(1, 5, 7), "WEATHER")
            .text(Anchor::right(2, 1, 3), &temperature)
            .text(Anchor::left(2, 4, 2), "°F")
            .text(Anchor::left(2, 8, 4), "WIND")
            .text(Anchor::right(2, 12, 3), &wind)
            .text(Anchor::left(2, 16, 3), "MPH")
            .text(Anchor::left(4, 4, 14), "WELCOME TO VBT")
            .text_with(Anchor::left(5, 4, 14), "BENTONVILLE,AR", COMMA)
            .render(),
    }
}

/// Shown in place of the weather when the source fails.
#[must_use]
pub fn weather_error() -> DisplayMatrix {
    Template::default()
        .text(Anchor::left(0, 0, 22), "WEATHER ERROR")
        .render()
}
