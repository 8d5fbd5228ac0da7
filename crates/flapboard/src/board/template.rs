//! Two-layer layout templates.
//!
//! A [`Template`] is a colour [`Background`] plus an ordered list of text
//! overlays. Each overlay owns a window (an [`Anchor`]) and writes exactly
//! that many tiles, so text never bleeds into decoration outside its window
//! and decoration never has to share a code space with text.

use super::charset::{self, Color, BLANK};
use super::format::Align;
use super::{DisplayMatrix, DisplayRow, COLS, ROWS};

/// A text window on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    /// Row index.
    pub row: usize,
    /// First column of the window.
    pub col: usize,
    /// Window width in tiles.
    pub width: usize,
    /// Placement of text inside the window.
    pub align: Align,
}

impl Anchor {
    /// Create an anchor.
    #[must_use]
    pub const fn new(row: usize, col: usize, width: usize, align: Align) -> Self {
        Self {
            row,
            col,
            width,
            align,
        }
    }

    /// A left-aligned window.
    #[must_use]
    pub const fn left(row: usize, col: usize, width: usize) -> Self {
        Self::new(row, col, width, Align::Left)
    }

    /// A centered window.
    #[must_use]
    pub const fn center(row: usize, col: usize, width: usize) -> Self {
        Self::new(row, col, width, Align::Center)
    }

    /// A right-aligned window.
    #[must_use]
    pub const fn right(row: usize, col: usize, width: usize) -> Self {
        Self::new(row, col, width, Align::Right)
    }
}

/// The decoration layer: one optional colour per tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background([[Option<Color>; COLS]; ROWS]);

impl Background {
    /// A background with no decoration.
    #[must_use]
    pub const fn empty() -> Self {
        Self([[None; COLS]; ROWS])
    }

    /// Build a background from one pattern string per row.
    ///
    /// Each character is a colour marker (`R`, `O`, `Y`, `G`, `B`, `V`, `W`,
    /// either case); anything else is a blank tile. Rows are padded or
    /// truncated to the board width.
    #[must_use]
    pub fn from_pattern(pattern: [&str; ROWS]) -> Self {
        let mut tiles = [[None; COLS]; ROWS];
        for (row, line) in tiles.iter_mut().zip(pattern) {
            for (cell, marker) in row.iter_mut().zip(line.chars()) {
                *cell = Color::from_marker(marker);
            }
        }
        Self(tiles)
    }

    /// The colour at a tile, if any.
    #[must_use]
    pub fn color_at(&self, row: usize, col: usize) -> Option<Color> {
        self.0.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    fn to_matrix(self) -> DisplayMatrix {
        DisplayMatrix::from_rows(self.0.iter().map(|row| {
            DisplayRow::from_codes(row.iter().map(|tile| tile.map_or(BLANK, Color::code)))
        }))
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::empty()
    }
}

/// One piece of text placed in an [`Anchor`] window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    anchor: Anchor,
    text: String,
    overrides: &'static [(char, u8)],
}

impl Overlay {
    /// Encode the overlay into the tiles of its window.
    fn codes(&self) -> impl Iterator<Item = u8> + '_ {
        self.anchor
            .align
            .apply(&self.text, self.anchor.width)
            .chars()
            .map(|c| {
                self.overrides
                    .iter()
                    .find(|(glyph, _)| *glyph == c)
                    .map_or_else(|| charset::encode(c), |&(_, code)| code)
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}

/// A background plus text overlays, rendered into a [`DisplayMatrix`].
///
/// Rendering is pure: the same template always yields the same matrix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    background: Background,
    overlays: Vec<Overlay>,
}

impl Template {
    /// Start a template from a background.
    #[must_use]
    pub fn new(background: Background) -> Self {
        Self {
            background,
            overlays: Vec::new(),
        }
    }

    /// Add text at an anchor. Surrounding whitespace is trimmed first.
    #[must_use]
    pub fn text(self, anchor: Anchor, text: &str) -> Self {
        self.text_with(anchor, text, &[])
    }

    /// Add text at an anchor, writing specific characters as the given
    /// tile codes instead of their character-table codes.
    #[must_use]
    pub fn text_with(mut self, anchor: Anchor, text: &str, overrides: &'static [(char, u8)]) -> Self {
        self.overlays.push(Overlay {
            anchor,
            text: text.trim().to_string(),
            overrides,
        });
        self
    }

    /// The background layer.
    #[must_use]
    pub fn background(&self) -> &Background {
        &self.background
    }

    /// Compose the layers. Overlays are applied in insertion order, each
    /// overwriting only the tiles in its own window.
    #[must_use]
    pub fn render(&self) -> DisplayMatrix {
        let mut matrix = self.background.to_matrix();
        for overlay in &self.overlays {
            let Some(row) = matrix.row_mut(overlay.anchor.row) else {
                continue;
            };
            for (offset, code) in overlay.codes().enumerate() {
                row.set(overlay.anchor.col + offset, code);
            }
        }
        matrix
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed() -> Background {
        Background::from_pattern([
            "RRRRRRRRRRRRRRRRRRRRRR",
            "R....................R",
            "R....................R",
            "R....................R",
            "R....................R",
            "RRRRRRRRRRRRRRRRRRRRRR",
        ])
    }

    #[test]
    fn test_background_from_pattern() {
        let bg = boxed();
        assert_eq!(bg.color_at(0, 0), Some(Color::Red));
        assert_eq!(bg.color_at(1, 1), None);
        assert_eq!(bg.color_at(1, 21), Some(Color::Red));
        assert_eq!(bg.color_at(6, 0), None);
    }

    #[test]
    fn test_background_short_pattern_pads_blank() {
        let bg = Background::from_pattern(["W", "", "", "", "", ""]);
        assert_eq!(bg.color_at(0, 0), Some(Color::White));
        assert_eq!(bg.color_at(0, 1), None);
    }

    #[test]
    fn test_render_background_only() {
        let matrix = Template::new(boxed()).render();
        assert_eq!(matrix.get(0, 5), Some(63));
        assert_eq!(matrix.get(2, 5), Some(BLANK));
    }

    #[test]
    fn test_overlay_writes_only_its_window() {
        let matrix = Template::new(boxed())
            .text(Anchor::center(2, 1, 20), "ALICE")
            .render();
        assert_eq!(matrix.get(2, 0), Some(63));
        assert_eq!(matrix.get(2, 21), Some(63));
        // 7 spaces of left padding inside the window
        assert_eq!(matrix.get(2, 8), Some(1));
        assert_eq!(matrix.get(2, 12), Some(5));
    }

    #[test]
    fn test_overlay_blanks_decoration_inside_window() {
        let matrix = Template::new(boxed())
            .text(Anchor::left(0, 2, 3), "")
            .render();
        assert_eq!(matrix.get(0, 1), Some(63));
        assert_eq!(matrix.get(0, 2), Some(BLANK));
        assert_eq!(matrix.get(0, 4), Some(BLANK));
        assert_eq!(matrix.get(0, 5), Some(63));
    }

    #[test]
    fn test_overlay_clips_at_board_edge() {
        let matrix = Template::default()
            .text(Anchor::left(0, 20, 5), "ABCDE")
            .render();
        assert_eq!(matrix.get(0, 20), Some(1));
        assert_eq!(matrix.get(0, 21), Some(2));
        assert_eq!(matrix.get(1, 0), Some(BLANK));
    }

    #[test]
    fn test_overlay_on_missing_row_is_ignored() {
        let matrix = Template::default()
            .text(Anchor::left(9, 0, 5), "ABCDE")
            .render();
        assert_eq!(matrix, DisplayMatrix::blank());
    }

    #[test]
    fn test_overrides_replace_table_codes() {
        static APOS: [(char, u8); 1] = [('\'', 52)];
        let matrix = Template::default()
            .text_with(Anchor::left(0, 0, 3), "A'B", &APOS)
            .render();
        assert_eq!(matrix.get(0, 1), Some(52));

        let plain = Template::default().text(Anchor::left(0, 0, 3), "A'B").render();
        assert_eq!(plain.get(0, 1), Some(49));
    }

    #[test]
    fn test_text_is_trimmed() {
        let matrix = Template::default()
            .text(Anchor::left(0, 0, 4), "  AB  ")
            .render();
        assert_eq!(matrix.get(0, 0), Some(1));
    }

    #[test]
    fn test_render_is_deterministic() {
        let template = Template::new(boxed()).text(Anchor::center(1, 1, 20), "SAME");
        assert_eq!(template.render(), template.render());
    }
}
