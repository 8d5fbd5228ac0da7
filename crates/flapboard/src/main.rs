//! `flapctl` - CLI for flapboard
//!
//! This binary manages the board's stored records and pushes rendered
//! matrices to the display.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;

use flapboard::board::DisplayMatrix;
use flapboard::cli::{
    BirthdayCommand, Cli, Command, ConfigCommand, DeleteArgs, DeleteTarget, EventsCommand,
    FlightsCommand, OutputArgs, PilotCommand, RecognitionCommand, WeatherCommand,
};
use flapboard::records::{Birthday, EmployeeRecognition, Event, Flight, PrivatePilot};
use flapboard::service::{BoardService, BoardUpdate, Update};
use flapboard::{init_logging, Config};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let command = match cli.command {
        Command::Config(config_cmd) => return handle_config(cli.config.as_deref(), config_cmd),
        command => command,
    };

    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;
    let service = BoardService::from_config(&config)?;

    match command {
        Command::Flights(cmd) => handle_flights(&service, cmd).await,
        Command::Events(cmd) => handle_events(&service, cmd).await,
        Command::Birthday(cmd) => handle_birthday(&service, cmd).await,
        Command::Recognition(cmd) => handle_recognition(&service, cmd).await,
        Command::Pilot(cmd) => handle_pilot(&service, cmd).await,
        Command::Weather(cmd) => handle_weather(&service, cmd).await,
        Command::Status(output) => handle_status(&service, &config, output),
        Command::Config(_) => Ok(()),
    }
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_matrix(matrix: &DisplayMatrix, output: OutputArgs) -> anyhow::Result<()> {
    if output.json {
        println!("{}", matrix.to_json()?);
    } else {
        println!("{}", matrix.preview());
    }
    Ok(())
}

/// Report a write's board result. The write itself already succeeded.
fn report_board(board: &BoardUpdate) {
    if board.is_failed() {
        eprintln!("warning: {board}");
    } else {
        println!("{board}");
    }
}

/// Report an explicit push, failing the command if the board refused it.
fn finish_push(board: &BoardUpdate) -> anyhow::Result<()> {
    if board.is_failed() {
        bail!("{board}");
    }
    println!("{board}");
    Ok(())
}

fn print_flights(flights: &[Flight], output: OutputArgs) -> anyhow::Result<()> {
    if output.json {
        return print_json(&flights);
    }
    if flights.is_empty() {
        println!("No flights stored.");
        return Ok(());
    }
    println!("{:<3} {:>4}  {:<5} {:<8} {:<4} DEST", "#", "ID", "TIME", "CALLSIGN", "TYPE");
    for (index, flight) in flights.iter().enumerate() {
        println!(
            "{index:<3} {:>4}  {:<5} {:<8} {:<4} {}",
            flight.id.unwrap_or_default(),
            flight.time,
            flight.callsign,
            flight.aircraft_type,
            flight.destination
        );
    }
    Ok(())
}

fn print_events(events: &[Event], output: OutputArgs) -> anyhow::Result<()> {
    if output.json {
        return print_json(&events);
    }
    if events.is_empty() {
        println!("No events stored.");
        return Ok(());
    }
    println!("{:<3} {:>4}  {:<5} {:<4} DESCRIPTION", "#", "ID", "DATE", "TIME");
    for (index, event) in events.iter().enumerate() {
        println!(
            "{index:<3} {:>4}  {:<5} {:<4} {}",
            event.id.unwrap_or_default(),
            event.date,
            event.time,
            event.description
        );
    }
    Ok(())
}

fn print_record<T: Serialize>(record: Option<&T>, output: OutputArgs, label: &str) -> anyhow::Result<()> {
    match record {
        Some(record) => print_json(record),
        None if output.json => print_json(&serde_json::Value::Null),
        None => {
            println!("No {label} stored.");
            Ok(())
        }
    }
}

async fn handle_flights(service: &BoardService, cmd: FlightsCommand) -> anyhow::Result<()> {
    match cmd {
        FlightsCommand::List(output) => print_flights(&service.list_flights(), output),
        FlightsCommand::Add(args) => {
            let Update { records, board } = service.add_flight(Flight::from(args)).await?;
            print_flights(&records, OutputArgs::default())?;
            report_board(&board);
            Ok(())
        }
        FlightsCommand::Delete(args) => {
            let Update { records, board } = match delete_target(&args)? {
                DeleteTarget::Id(id) => service.delete_flight(id).await?,
                DeleteTarget::Index(index) => service.delete_flight_at(index).await?,
            };
            print_flights(&records, OutputArgs::default())?;
            report_board(&board);
            Ok(())
        }
        FlightsCommand::Show(output) => print_matrix(&service.flights_matrix(), output),
        FlightsCommand::Push => finish_push(&service.push_flights().await),
    }
}

async fn handle_events(service: &BoardService, cmd: EventsCommand) -> anyhow::Result<()> {
    match cmd {
        EventsCommand::List(output) => print_events(&service.list_events(), output),
        EventsCommand::Add(args) => {
            let Update { records, board } = service.add_event(Event::from(args)).await?;
            print_events(&records, OutputArgs::default())?;
            report_board(&board);
            Ok(())
        }
        EventsCommand::Delete(args) => {
            let Update { records, board } = match delete_target(&args)? {
                DeleteTarget::Id(id) => service.delete_event(id).await?,
                DeleteTarget::Index(index) => service.delete_event_at(index).await?,
            };
            print_events(&records, OutputArgs::default())?;
            report_board(&board);
            Ok(())
        }
        EventsCommand::Show(output) => print_matrix(&service.events_matrix(), output),
        EventsCommand::Push => finish_push(&service.push_events().await),
    }
}

fn delete_target(args: &DeleteArgs) -> anyhow::Result<DeleteTarget> {
    args.target().context("either an id or --index is required")
}

async fn handle_birthday(service: &BoardService, cmd: BirthdayCommand) -> anyhow::Result<()> {
    match cmd {
        BirthdayCommand::Get(output) => print_record(service.get_birthday().as_ref(), output, "birthday"),
        BirthdayCommand::Set {
            first_name,
            date,
            push,
        } => {
            let record = Birthday::new(&first_name, &date)?;
            let update = service.save_birthday(record, push).await?;
            print_json(&update.records)?;
            report_board(&update.board);
            Ok(())
        }
        BirthdayCommand::Show(output) => print_matrix(&service.birthday_matrix()?, output),
        BirthdayCommand::Push => finish_push(&service.push_birthday().await?),
    }
}

async fn handle_recognition(service: &BoardService, cmd: RecognitionCommand) -> anyhow::Result<()> {
    match cmd {
        RecognitionCommand::Get(output) => {
            print_record(service.get_recognition().as_ref(), output, "recognition")
        }
        RecognitionCommand::Set {
            first_name,
            last_name,
            push,
        } => {
            let record = EmployeeRecognition::new(&first_name, &last_name)?;
            let update = service.save_recognition(record, push).await?;
            print_json(&update.records)?;
            report_board(&update.board);
            Ok(())
        }
        RecognitionCommand::Show(output) => print_matrix(&service.recognition_matrix()?, output),
        RecognitionCommand::Push => finish_push(&service.push_recognition().await?),
    }
}

async fn handle_pilot(service: &BoardService, cmd: PilotCommand) -> anyhow::Result<()> {
    match cmd {
        PilotCommand::Get(output) => print_record(service.get_pilot().as_ref(), output, "private pilot"),
        PilotCommand::Set { name, push } => {
            let update = service.save_pilot(PrivatePilot::new(&name)?, push).await?;
            print_json(&update.records)?;
            report_board(&update.board);
            Ok(())
        }
        PilotCommand::Show(output) => print_matrix(&service.pilot_matrix()?, output),
        PilotCommand::Push => finish_push(&service.push_pilot().await?),
    }
}

async fn handle_weather(service: &BoardService, cmd: WeatherCommand) -> anyhow::Result<()> {
    match cmd {
        WeatherCommand::Show(output) => print_matrix(&service.weather_matrix().await, output),
        WeatherCommand::Push => finish_push(&service.push_weather().await?),
    }
}

fn handle_status(service: &BoardService, config: &Config, output: OutputArgs) -> anyhow::Result<()> {
    let status = service.rate_limit_status();
    if output.json {
        let status = serde_json::json!({
            "rateLimit": status,
            "databasePath": config.database_path(),
            "flights": service.list_flights().len(),
            "events": service.list_events().len(),
        });
        return print_json(&status);
    }

    println!("flapctl status");
    println!("--------------");
    println!("Board:         {}", config.board.api_url);
    println!("Rate limit:    {}", status.message);
    println!("Database:      {}", config.database_path().display());
    println!("Flights:       {}", service.list_flights().len());
    println!("Events:        {}", service.list_events().len());
    Ok(())
}

fn handle_config(config_path: Option<&Path>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show(output) => {
            let config = Config::load_from(config_path.map(Path::to_path_buf))?.redacted();
            if output.json {
                return print_json(&config);
            }
            print!("{}", config.to_toml()?);
        }
        ConfigCommand::Path => {
            let path = config_path.map_or_else(Config::default_config_path, Path::to_path_buf);
            println!("{}", path.display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or_else(|| config_path.map(Path::to_path_buf))
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            Config::load_from(Some(path)).context("configuration is invalid")?;
            println!("Configuration is valid.");
        }
    }
    Ok(())
}
