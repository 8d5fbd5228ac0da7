//! Fixed-width field formatting.
//!
//! All widths count characters, not bytes. Every function returns a string
//! of exactly `width` characters: overflow is dropped from the right, short
//! input is padded with spaces.

/// How a field is placed inside its window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Text starts at the left edge.
    #[default]
    Left,
    /// Text is centered; an odd leftover space goes on the right.
    Center,
    /// Text ends at the right edge.
    Right,
}

impl Align {
    /// Format `text` into a field of `width` characters.
    #[must_use]
    pub fn apply(self, text: &str, width: usize) -> String {
        match self {
            Self::Left => pad_end(text, width),
            Self::Center => center(text, width),
            Self::Right => pad_start(text, width),
        }
    }
}

/// Keep at most the first `width` characters.
#[must_use]
pub fn truncate(text: &str, width: usize) -> String {
    text.chars().take(width).collect()
}

/// Center `text` in `width` characters.
///
/// Input at least `width` long is truncated to its first `width`
/// characters.
#[must_use]
pub fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return truncate(text, width);
    }
    let left = (width - len) / 2;
    let right = width - len - left;
    format!("{}{text}{}", " ".repeat(left), " ".repeat(right))
}

/// Truncate, then pad on the right to `width`.
#[must_use]
pub fn pad_end(text: &str, width: usize) -> String {
    let mut out = truncate(text, width);
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

/// Truncate, then pad on the left to `width`.
#[must_use]
pub fn pad_start(text: &str, width: usize) -> String {
    let body = truncate(text, width);
    let len = body.chars().count();
    format!("{}{body}", " ".repeat(width - len))
}

/// Join fields into one line, each fitted to its column width and
/// separated by single spaces.
///
/// The caller picks widths so that the widths plus separators add up to
/// the row length it needs.
#[must_use]
pub fn join_columns(fields: &[(&str, usize)]) -> String {
    fields
        .iter()
        .map(|&(text, width)| pad_end(text, width))
        .collect::<Vec<_>>()
        .join(" ")
}
