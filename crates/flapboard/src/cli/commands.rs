//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::records::{Event, Flight};

/// Output selection shared by read commands.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct OutputArgs {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Which record a delete applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteTarget {
    /// Storage id.
    Id(i64),
    /// Position in the listing.
    Index(usize),
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Storage id of the record
    #[arg(required_unless_present = "index", conflicts_with = "index")]
    pub id: Option<i64>,

    /// Position in the listing, starting at 0
    #[arg(long)]
    pub index: Option<usize>,
}

impl DeleteArgs {
    /// The record to delete. clap guarantees exactly one is present.
    #[must_use]
    pub fn target(&self) -> Option<DeleteTarget> {
        match (self.id, self.index) {
            (Some(id), _) => Some(DeleteTarget::Id(id)),
            (None, Some(index)) => Some(DeleteTarget::Index(index)),
            (None, None) => None,
        }
    }
}

/// New flight arguments.
#[derive(Debug, Args)]
pub struct FlightArgs {
    /// Time of day (HH:MM, HHMM, ...)
    pub time: String,

    /// Student or aircraft callsign
    pub callsign: String,

    /// Destination airport
    pub destination: String,

    /// Checkride type (defaults to PPL)
    #[arg(short = 't', long = "type")]
    pub aircraft_type: Option<String>,
}

impl From<FlightArgs> for Flight {
    fn from(args: FlightArgs) -> Self {
        Self {
            id: None,
            time: args.time,
            callsign: args.callsign,
            aircraft_type: args.aircraft_type.unwrap_or_default(),
            destination: args.destination,
        }
    }
}

/// New event arguments.
#[derive(Debug, Args)]
pub struct EventArgs {
    /// Date as MM/DD
    pub date: String,

    /// Short description
    pub description: String,

    /// Time of day
    #[arg(short, long, default_value = "")]
    pub time: String,
}

impl From<EventArgs> for Event {
    fn from(args: EventArgs) -> Self {
        Self {
            id: None,
            date: args.date,
            time: args.time,
            description: args.description,
        }
    }
}

/// Flight commands.
#[derive(Debug, Subcommand)]
pub enum FlightsCommand {
    /// List stored flights in board order
    List(OutputArgs),
    /// Add a flight and update the board
    Add(FlightArgs),
    /// Delete a flight and update the board
    Delete(DeleteArgs),
    /// Preview the checkride board
    Show(OutputArgs),
    /// Push the checkride board
    Push,
}

/// Event commands.
#[derive(Debug, Subcommand)]
pub enum EventsCommand {
    /// List stored events, soonest first
    List(OutputArgs),
    /// Add an event and update the board
    Add(EventArgs),
    /// Delete an event and update the board
    Delete(DeleteArgs),
    /// Preview the events board
    Show(OutputArgs),
    /// Push the events board
    Push,
}

/// Birthday commands.
#[derive(Debug, Subcommand)]
pub enum BirthdayCommand {
    /// Show the stored birthday
    Get(OutputArgs),
    /// Store a birthday
    Set {
        /// First name
        first_name: String,
        /// Date as MM/DD
        date: String,
        /// Also update the board
        #[arg(long)]
        push: bool,
    },
    /// Preview the birthday board
    Show(OutputArgs),
    /// Push the birthday board
    Push,
}

/// Employee recognition commands.
#[derive(Debug, Subcommand)]
pub enum RecognitionCommand {
    /// Show the stored recognition
    Get(OutputArgs),
    /// Store a recognition
    Set {
        /// First name
        first_name: String,
        /// Last name
        last_name: String,
        /// Also update the board
        #[arg(long)]
        push: bool,
    },
    /// Preview the recognition board
    Show(OutputArgs),
    /// Push the recognition board
    Push,
}

/// Private pilot commands.
#[derive(Debug, Subcommand)]
pub enum PilotCommand {
    /// Show the stored pilot
    Get(OutputArgs),
    /// Store the newest private pilot
    Set {
        /// Pilot's name
        name: String,
        /// Also update the board
        #[arg(long)]
        push: bool,
    },
    /// Preview the private pilot board
    Show(OutputArgs),
    /// Push the private pilot board
    Push,
}

/// Weather commands.
#[derive(Debug, Subcommand)]
pub enum WeatherCommand {
    /// Fetch conditions and preview the weather board
    Show(OutputArgs),
    /// Fetch conditions and push the weather board
    Push,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration (keys masked)
    Show(OutputArgs),

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}
