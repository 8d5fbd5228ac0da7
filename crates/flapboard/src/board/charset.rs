//! Character codec for the board's tile set.
//!
//! Letters are case-insensitive; anything the board cannot show degrades
//! to the blank tile rather than failing.

use serde::{Deserialize, Serialize};

/// The blank tile.
pub const BLANK: u8 = 0;

/// The board's own apostrophe tile. The character table places `'` at 49,
/// so captions that need the real apostrophe glyph override it.
pub const APOSTROPHE_TILE: u8 = 52;

/// The board's own comma tile, used the same way as [`APOSTROPHE_TILE`].
pub const COMMA_TILE: u8 = 55;

/// Punctuation and symbol tiles.
const SYMBOLS: [(char, u8); 20] = [
    ('!', 37),
    ('@', 38),
    ('#', 39),
    ('$', 40),
    ('(', 41),
    (')', 42),
    ('+', 43),
    ('-', 44),
    ('&', 45),
    ('=', 46),
    (';', 47),
    (':', 48),
    ('\'', 49),
    ('"', 50),
    ('%', 51),
    (',', 52),
    ('.', 53),
    ('/', 59),
    ('?', 60),
    ('°', 62),
];

/// Encode a single character as a tile code.
///
/// Lowercase ASCII folds to uppercase before lookup. Characters outside
/// the table map to [`BLANK`].
#[must_use]
pub fn encode(c: char) -> u8 {
    let c = c.to_ascii_uppercase();
    match c {
        'A'..='Z' => ascii_offset(c, b'A', 1),
        '1'..='9' => ascii_offset(c, b'1', 27),
        '0' => 36,
        _ => SYMBOLS
            .iter()
            .find(|(glyph, _)| *glyph == c)
            .map_or(BLANK, |&(_, code)| code),
    }
}

fn ascii_offset(c: char, origin: u8, base: u8) -> u8 {
    u8::try_from(c).map_or(BLANK, |b| b - origin + base)
}

/// Encode every character of a string.
#[must_use]
pub fn encode_str(text: &str) -> Vec<u8> {
    text.chars().map(encode).collect()
}

/// The character a text tile shows, if the code is a text tile.
///
/// The blank tile decodes to a space.
#[must_use]
pub fn glyph(code: u8) -> Option<char> {
    match code {
        BLANK => Some(' '),
        1..=26 => Some(char::from(b'A' + code - 1)),
        27..=35 => Some(char::from(b'1' + code - 27)),
        36 => Some('0'),
        _ => SYMBOLS
            .iter()
            .find(|&&(_, c)| c == code)
            .map(|&(glyph, _)| glyph),
    }
}

/// Solid colour tiles. These live only in template backgrounds; no
/// character encodes to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    /// Code 63.
    Red,
    /// Code 64.
    Orange,
    /// Code 65.
    Yellow,
    /// Code 66.
    Green,
    /// Code 67.
    Blue,
    /// Code 68.
    Violet,
    /// Code 69.
    White,
}

impl Color {
    /// Every colour, in code order.
    pub const ALL: [Self; 7] = [
        Self::Red,
        Self::Orange,
        Self::Yellow,
        Self::Green,
        Self::Blue,
        Self::Violet,
        Self::White,
    ];

    /// The tile code for this colour.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Red => 63,
            Self::Orange => 64,
            Self::Yellow => 65,
            Self::Green => 66,
            Self::Blue => 67,
            Self::Violet => 68,
            Self::White => 69,
        }
    }

    /// Look up a colour by tile code.
    #[must_use]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|color| color.code() == code)
    }

    /// Single-letter marker used in layout patterns (uppercase) and
    /// previews (lowercase).
    #[must_use]
    pub const fn marker(self) -> char {
        match self {
            Self::Red => 'r',
            Self::Orange => 'o',
            Self::Yellow => 'y',
            Self::Green => 'g',
            Self::Blue => 'b',
            Self::Violet => 'v',
            Self::White => 'w',
        }
    }

    /// Parse a pattern marker, either case.
    #[must_use]
    pub fn from_marker(marker: char) -> Option<Self> {
        let marker = marker.to_ascii_lowercase();
        Self::ALL.into_iter().find(|color| color.marker() == marker)
    }
}
