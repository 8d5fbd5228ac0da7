//! Command-line interface for flapboard.
//!
//! This module provides the CLI structure for the `flapctl` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BirthdayCommand, ConfigCommand, DeleteArgs, DeleteTarget, EventArgs, EventsCommand,
    FlightArgs, FlightsCommand, OutputArgs, PilotCommand, RecognitionCommand, WeatherCommand,
};

use crate::logging::Verbosity;

/// flapctl - Drive a split-flap display board
///
/// Stores checkrides, events and announcements, renders them as 6x22 tile
/// matrices and pushes them to the board.
#[derive(Debug, Parser)]
#[command(name = "flapctl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage checkride flights
    #[command(subcommand)]
    Flights(FlightsCommand),

    /// Manage upcoming events
    #[command(subcommand)]
    Events(EventsCommand),

    /// Manage the birthday board
    #[command(subcommand)]
    Birthday(BirthdayCommand),

    /// Manage the employee recognition board
    #[command(subcommand)]
    Recognition(RecognitionCommand),

    /// Manage the private pilot board
    #[command(subcommand)]
    Pilot(PilotCommand),

    /// Show or push current weather
    #[command(subcommand)]
    Weather(WeatherCommand),

    /// Show rate limit and storage status
    Status(OutputArgs),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("flapctl").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "flapctl");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_flights_add() {
        let cli = parse(&["flights", "add", "09:30", "N12345", "KXNA", "--type", "IR"]);
        let Command::Flights(FlightsCommand::Add(args)) = cli.command else {
            panic!("expected flights add");
        };
        assert_eq!(args.callsign, "N12345");
        assert_eq!(args.aircraft_type.as_deref(), Some("IR"));
    }

    #[test]
    fn test_parse_delete_by_id_or_index() {
        let cli = parse(&["events", "delete", "4"]);
        let Command::Events(EventsCommand::Delete(args)) = cli.command else {
            panic!("expected events delete");
        };
        assert_eq!(args.target(), Some(DeleteTarget::Id(4)));

        let cli = parse(&["flights", "delete", "--index", "1"]);
        let Command::Flights(FlightsCommand::Delete(args)) = cli.command else {
            panic!("expected flights delete");
        };
        assert_eq!(args.target(), Some(DeleteTarget::Index(1)));
    }

    #[test]
    fn test_delete_requires_a_target() {
        let args = ["flapctl", "flights", "delete"];
        assert!(Cli::try_parse_from(args).is_err());
        let args = ["flapctl", "flights", "delete", "3", "--index", "1"];
        assert!(Cli::try_parse_from(args).is_err());
    }

    #[test]
    fn test_parse_birthday_set_with_push() {
        let cli = parse(&["birthday", "set", "Ada", "12/10", "--push"]);
        assert!(matches!(
            cli.command,
            Command::Birthday(BirthdayCommand::Set { push: true, .. })
        ));
    }

    #[test]
    fn test_parse_show_json() {
        let cli = parse(&["weather", "show", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Weather(WeatherCommand::Show(OutputArgs { json: true }))
        ));
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }

    #[test]
    fn test_parse_config_validate_file() {
        let cli = parse(&["config", "validate", "--file", "/tmp/board.toml"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Validate { file: Some(_) })
        ));
    }
}
