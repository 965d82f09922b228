//! Whitespace padding of punctuation so every token is space-delimited.
//!
//! Downstream diffing and edit construction only work on token boundaries,
//! so every punctuation character of the fixed class becomes a standalone
//! token and runs of whitespace collapse to a single space. Quoted literals
//! are masked first and restored verbatim, so their interiors are never
//! disturbed.

use crate::mask::{mask, unmask};
use regex::Regex;
use std::sync::LazyLock;

/// The punctuation class, longest alternatives first so compound operators
/// like `+=` and `<<` stay single tokens.
static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r";|\(|\)|[\+\-\*\/%]=|->|\+\+|\+|\-\-|\-|\*\*|\*|\/\/|\/|%|\{|\}|[<>=!][<>=]|[<>=]|!|\^|&&|&|\|\||\||::|:|,",
    )
    .unwrap()
});

/// Pad `code` so that every punctuation token and every identifier is a
/// maximal whitespace-delimited token.
///
/// Pipeline: mask literals, space-wrap each punctuation match, split the
/// diamond operator `<>`, collapse whitespace runs, trim, unmask. Idempotent.
pub fn pad(code: &str) -> String {
    let (masked, table) = mask(code);

    let spaced = PUNCTUATION.replace_all(&masked, " ${0} ");
    let spaced = spaced.replace("<>", "< >");

    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    unmask(&collapsed, &table)
}
