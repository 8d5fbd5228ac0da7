//! The split-flap board's wire artifact and the encoders that produce it.
//!
//! The board shows a fixed grid of [`ROWS`] x [`COLS`] tiles, each addressed
//! by an integer code. Every render path in this crate ends in a
//! [`DisplayMatrix`], which serializes to exactly the JSON the board's
//! write endpoint expects: an array of 6 arrays of 22 integers.
//!
//! - [`charset`] maps characters to tile codes.
//! - [`format`] produces exact-width strings (center, pad, truncate).
//! - [`template`] composes a colour background with text overlays.
//! - [`layouts`] holds the per-record templates.
//! - [`assemble`] builds the list screens (flights, events).

pub mod assemble;
pub mod charset;
pub mod format;
pub mod layouts;
pub mod template;

use std::fmt;

use serde::{Deserialize, Serialize};

use self::charset::{Color, BLANK};

/// Number of rows on the board.
pub const ROWS: usize = 6;

/// Number of tiles in each row.
pub const COLS: usize = 22;

/// A single row of tile codes. Always exactly [`COLS`] wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayRow([u8; COLS]);

impl DisplayRow {
    /// A row of blank tiles.
    #[must_use]
    pub const fn blank() -> Self {
        Self([BLANK; COLS])
    }

    /// Build a row from any number of codes.
    ///
    /// Shorter input is padded with blanks; longer input is truncated.
    #[must_use]
    pub fn from_codes(codes: impl IntoIterator<Item = u8>) -> Self {
        let mut row = Self::blank();
        for (cell, code) in row.0.iter_mut().zip(codes) {
            *cell = code;
        }
        row
    }

    /// Encode a string into a row, padding or truncating to [`COLS`].
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_codes(text.chars().map(charset::encode))
    }

    /// The codes in this row.
    #[must_use]
    pub const fn codes(&self) -> &[u8; COLS] {
        &self.0
    }

    /// Overwrite one tile. Columns outside the row are ignored.
    pub fn set(&mut self, col: usize, code: u8) {
        if let Some(cell) = self.0.get_mut(col) {
            *cell = code;
        }
    }

    /// Read one tile.
    #[must_use]
    pub fn get(&self, col: usize) -> Option<u8> {
        self.0.get(col).copied()
    }
}

impl Default for DisplayRow {
    fn default() -> Self {
        Self::blank()
    }
}

/// The full board: exactly [`ROWS`] rows of [`COLS`] codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DisplayMatrix([DisplayRow; ROWS]);

impl DisplayMatrix {
    /// An all-blank board.
    #[must_use]
    pub const fn blank() -> Self {
        Self([DisplayRow::blank(); ROWS])
    }

    /// Build a matrix from rows, padding with blank rows or dropping extras.
    #[must_use]
    pub fn from_rows(rows: impl IntoIterator<Item = DisplayRow>) -> Self {
        let mut matrix = Self::blank();
        for (slot, row) in matrix.0.iter_mut().zip(rows) {
            *slot = row;
        }
        matrix
    }

    /// The rows of the matrix.
    #[must_use]
    pub const fn rows(&self) -> &[DisplayRow; ROWS] {
        &self.0
    }

    /// Mutable access to one row.
    pub fn row_mut(&mut self, row: usize) -> Option<&mut DisplayRow> {
        self.0.get_mut(row)
    }

    /// Read one tile.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        self.0.get(row).and_then(|r| r.get(col))
    }

    /// The plain nested-array form sent to the board.
    #[must_use]
    pub fn to_codes(&self) -> Vec<Vec<u8>> {
        self.0.iter().map(|row| row.codes().to_vec()).collect()
    }

    /// Serialize to the board's JSON wire format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Render a human-readable preview of the board for terminals.
    ///
    /// Text tiles show their glyph; colour tiles show a lowercase marker
    /// (`r`, `o`, `y`, `g`, `b`, `v`, `w`); unknown codes show `?`.
    #[must_use]
    pub fn preview(&self) -> String {
        let border = format!("+{}+", "-".repeat(COLS));
        let mut out = String::with_capacity((COLS + 3) * (ROWS + 2));
        out.push_str(&border);
        out.push('\n');
        for row in &self.0 {
            out.push('|');
            for &code in row.codes() {
                let ch = charset::glyph(code)
                    .or_else(|| Color::from_code(code).map(Color::marker))
                    .unwrap_or('?');
                out.push(ch);
            }
            out.push_str("|\n");
        }
        out.push_str(&border);
        out
    }
}

impl Default for DisplayMatrix {
    fn default() -> Self {
        Self::blank()
    }
}

impl fmt::Display for DisplayMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.preview())
    }
}
