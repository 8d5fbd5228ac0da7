//! Domain records shown on the board.
//!
//! Records deserialize leniently (absent fields become empty strings) so
//! that anything already in the store can still be rendered. The `new`
//! constructors are the strict path used for user input.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::board::format::truncate;
use crate::error::{Error, Result};

/// Flight type used when none is given.
pub const DEFAULT_FLIGHT_TYPE: &str = "PPL";

/// Event field limits, in characters.
pub const EVENT_DATE_WIDTH: usize = 5;
/// See [`EVENT_DATE_WIDTH`].
pub const EVENT_TIME_WIDTH: usize = 4;
/// See [`EVENT_DATE_WIDTH`].
pub const EVENT_DESCRIPTION_WIDTH: usize = 16;

/// Kinds of content the board can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Checkride list.
    Flights,
    /// Upcoming events list.
    Events,
    /// Birthday card.
    Birthday,
    /// Employee recognition card.
    EmployeeRecognition,
    /// Newest private pilot card.
    PrivatePilot,
    /// Current weather.
    Weather,
}

impl EntityKind {
    /// Every kind.
    pub const ALL: [Self; 6] = [
        Self::Flights,
        Self::Events,
        Self::Birthday,
        Self::EmployeeRecognition,
        Self::PrivatePilot,
        Self::Weather,
    ];

    /// Snake-case name, also used as the storage collection.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Flights => "flights",
            Self::Events => "events",
            Self::Birthday => "birthday",
            Self::EmployeeRecognition => "employee_recognition",
            Self::PrivatePilot => "private_pilot",
            Self::Weather => "weather",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record persisted in its own collection.
pub trait Record: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync {
    /// Kind (and collection) the record belongs to.
    const KIND: EntityKind;

    /// Attach the storage identifier. Records without one ignore it.
    #[must_use]
    fn with_id(self, _id: i64) -> Self {
        self
    }
}

fn month_day_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(0?[1-9]|1[0-2])/(0?[1-9]|[12][0-9]|3[01])$").expect("Invalid regex pattern")
    })
}

fn required(field: &'static str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(field, "is required"));
    }
    Ok(value.to_string())
}

fn month_day(field: &'static str, value: &str) -> Result<String> {
    let value = required(field, value)?;
    if !month_day_pattern().is_match(&value) {
        return Err(Error::validation(field, format!("expected MM/DD, got {value:?}")));
    }
    Ok(value)
}

/// A scheduled checkride.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Flight {
    /// Storage identifier, absent until stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Time of day (`HH:MM`, `HHMM`, ...).
    pub time: String,
    /// Student or aircraft callsign.
    pub callsign: String,
    /// Checkride type.
    #[serde(rename = "type")]
    pub aircraft_type: String,
    /// Destination airport.
    pub destination: String,
}

impl Flight {
    /// Validate user input. A blank type becomes [`DEFAULT_FLIGHT_TYPE`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if time, callsign or destination is blank.
    pub fn new(time: &str, callsign: &str, aircraft_type: Option<&str>, destination: &str) -> Result<Self> {
        let aircraft_type = aircraft_type
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_FLIGHT_TYPE);
        Ok(Self {
            id: None,
            time: required("time", time)?,
            callsign: required("callsign", callsign)?,
            aircraft_type: aircraft_type.to_string(),
            destination: required("destination", destination)?,
        })
    }
}

impl Record for Flight {
    const KIND: EntityKind = EntityKind::Flights;

    fn with_id(self, id: i64) -> Self {
        Self { id: Some(id), ..self }
    }
}

/// A dated event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Event {
    /// Storage identifier, absent until stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// `MM/DD`.
    pub date: String,
    /// Optional time of day.
    pub time: String,
    /// Short description.
    pub description: String,
}

impl Event {
    /// Validate user input, truncating each field to its board width.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the date or description is blank, or
    /// the date is not `MM/DD`.
    pub fn new(date: &str, time: &str, description: &str) -> Result<Self> {
        let date = truncate(&required("date", date)?, EVENT_DATE_WIDTH);
        Ok(Self {
            id: None,
            date: month_day("date", &date)?,
            time: truncate(time.trim(), EVENT_TIME_WIDTH),
            description: truncate(&required("description", description)?, EVENT_DESCRIPTION_WIDTH),
        })
    }
}

impl Record for Event {
    const KIND: EntityKind = EntityKind::Events;

    fn with_id(self, id: i64) -> Self {
        Self { id: Some(id), ..self }
    }
}

/// Today's birthday.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Birthday {
    /// First name.
    pub first_name: String,
    /// `MM/DD`.
    pub date: String,
}

impl Birthday {
    /// Validate user input.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either field is blank or the date is
    /// not `MM/DD`.
    pub fn new(first_name: &str, date: &str) -> Result<Self> {
        Ok(Self {
            first_name: required("firstName", first_name)?,
            date: month_day("date", date)?,
        })
    }
}

impl Record for Birthday {
    const KIND: EntityKind = EntityKind::Birthday;
}

/// An employee being recognized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EmployeeRecognition {
    /// First name.
    pub first_name: String,
    /// Last name.
    pub last_name: String,
}

impl EmployeeRecognition {
    /// Validate user input.
    ///
    /// # Errors
    ///
    /// Returns a validation error if either name is blank.
    pub fn new(first_name: &str, last_name: &str) -> Result<Self> {
        Ok(Self {
            first_name: required("firstName", first_name)?,
            last_name: required("lastName", last_name)?,
        })
    }
}

impl Record for EmployeeRecognition {
    const KIND: EntityKind = EntityKind::EmployeeRecognition;
}

/// The newest private pilot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivatePilot {
    /// Pilot's name.
    pub name: String,
}

impl PrivatePilot {
    /// Validate user input.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is blank.
    pub fn new(name: &str) -> Result<Self> {
        Ok(Self {
            name: required("name", name)?,
        })
    }
}

impl Record for PrivatePilot {
    const KIND: EntityKind = EntityKind::PrivatePilot;
}

/// Current conditions, already rounded for display.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherReport {
    /// Temperature in the configured units.
    pub temperature: i32,
    /// Wind speed in the configured units.
    pub wind: i32,
    /// Condition keyword (`Clear`, `Clouds`, `Rain`, ...).
    pub condition: String,
}
