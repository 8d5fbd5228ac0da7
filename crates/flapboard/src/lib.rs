//! `flapboard` - Split-flap display board driver
//!
//! This library turns stored records (checkrides, events, announcements,
//! weather) into 6x22 tile matrices and delivers them to the board
//! through a rate-limit aware client.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod logging;
pub mod records;
pub mod service;
pub mod storage;
pub mod transport;
pub mod weather;

pub use board::{DisplayMatrix, DisplayRow};
pub use config::Config;
pub use error::{Error, Result};
pub use gate::{RateGate, RateLimitState};
pub use logging::init_logging;
pub use records::EntityKind;
pub use service::{BoardService, BoardUpdate, Update};
pub use storage::DocumentStore;
pub use transport::{DisplayClient, DisplayTransport, HttpTransport};
pub use weather::{OpenWeatherClient, WeatherSource};
