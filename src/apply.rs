//! Parsing of edit scripts and reverse application to a padded source.
//!
//! Scripts may come from a model, so the parser is deliberately defensive:
//! a missing terminator, duplicated tags, or tags in the wrong order reject
//! the script instead of corrupting the source.

use crate::pad::pad;
use crate::tokens::{REPLACE_END, REPLACE_NEWS, REPLACE_OLDS};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("record {index} contains {count} OLD-family tags, expected exactly one")]
    OldTagCount { index: usize, count: usize },

    #[error("record {index} contains {count} NEW-family tags, expected exactly one")]
    NewTagCount { index: usize, count: usize },

    #[error("record {index} has its NEW tag before its OLD tag")]
    TagOrder { index: usize },

    #[error("trailing content after the last record terminator")]
    UnterminatedRecord,

    #[error("record has an empty payload")]
    EmptyPattern,

    #[error("pattern {pattern:?} occurs {count} times in the apply window, expected one")]
    AmbiguousPattern { pattern: String, count: usize },

    #[error("pattern {pattern:?} not found in the apply window")]
    MissingPattern { pattern: String },
}

/// Parse a script into `(old, new)` pairs in script order.
pub fn parse_script(script: &str) -> Result<Vec<(String, String)>, DecodeError> {
    let segments: Vec<&str> = script.split(REPLACE_END).collect();
    let (trailer, rows) = segments.split_last().expect("split yields at least one");
    if !trailer.trim().is_empty() {
        return Err(DecodeError::UnterminatedRecord);
    }

    let mut pairs = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        let old_hits = tag_hits(row, &REPLACE_OLDS);
        if old_hits.len() != 1 {
            return Err(DecodeError::OldTagCount {
                index,
                count: old_hits.len(),
            });
        }
        let new_hits = tag_hits(row, &REPLACE_NEWS);
        if new_hits.len() != 1 {
            return Err(DecodeError::NewTagCount {
                index,
                count: new_hits.len(),
            });
        }

        let (old_pos, old_tag) = old_hits[0];
        let (new_pos, new_tag) = new_hits[0];
        if new_pos < old_pos {
            return Err(DecodeError::TagOrder { index });
        }

        let old = row[old_pos + old_tag.len()..new_pos].trim();
        let new = row[new_pos + new_tag.len()..].trim();
        pairs.push((old.to_string(), new.to_string()));
    }

    Ok(pairs)
}

/// Every occurrence of any tag from `family` in `row`, in position order.
fn tag_hits<'a>(row: &str, family: &[&'a str]) -> Vec<(usize, &'a str)> {
    let mut hits: Vec<(usize, &str)> = family
        .iter()
        .flat_map(|tag| row.match_indices(*tag).map(move |(pos, _)| (pos, *tag)))
        .collect();
    hits.sort_unstable_by_key(|(pos, _)| *pos);
    hits
}

/// Apply the pairs to the padded source, last record first.
///
/// `last_index` tracks the start of the most recent replacement. Each
/// pattern must occur exactly once in `padded[0 .. last_index + |old| - 1]`;
/// the window deliberately reaches one byte short of a full `old` past
/// `last_index` so a replacement made by a later record still counts if it
/// reintroduces the pattern. The window must be preserved exactly for
/// compatibility with scripts emitted by trained models.
pub fn apply_pairs(source: &str, pairs: &[(String, String)]) -> Result<String, DecodeError> {
    let mut padded = pad(source);
    let mut last_index = padded.len();

    for (old, new) in pairs.iter().rev() {
        if old.is_empty() || new.is_empty() {
            return Err(DecodeError::EmptyPattern);
        }

        let mut end = (last_index + old.len() - 1).min(padded.len());
        while !padded.is_char_boundary(end) {
            end -= 1;
        }
        let window = &padded[..end];

        let count = window.matches(old.as_str()).count();
        if count > 1 {
            return Err(DecodeError::AmbiguousPattern {
                pattern: old.clone(),
                count,
            });
        }
        let Some(pos) = window.find(old.as_str()) else {
            return Err(DecodeError::MissingPattern {
                pattern: old.clone(),
            });
        };

        padded.replace_range(pos..pos + old.len(), new);
        last_index = pos;
    }

    Ok(padded)
}

/// Parse and apply in one step, surfacing the failure class.
pub fn try_apply(script: &str, source: &str) -> Result<String, DecodeError> {
    let pairs = parse_script(script)?;
    apply_pairs(source, &pairs)
}

/// The tolerant surface: any malformed script or failed application yields
/// `None`, never a corrupted source.
pub fn apply_edit_script(script: &str, source: &str) -> Option<String> {
    match try_apply(script, source) {
        Ok(applied) => Some(applied),
        Err(error) => {
            debug!(%error, "edit script rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_bare_record() {
        let pairs = parse_script("[<replaceOld>] x [<replaceNew>] y [<replaceEnd>]").unwrap();
        assert_eq!(pairs, vec![("x".to_string(), "y".to_string())]);
    }

    #[test]
    fn test_parse_keeps_script_order() {
        let script = "[<replaceOld>] a [<replaceNew>] c [<replaceEnd>] \
                      [<replaceOldKeepBefore>] x b [<replaceNewKeepBefore>] x d [<replaceEnd>]";
        let pairs = parse_script(script).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].0, "a");
        assert_eq!(pairs[1].0, "x b");
    }

    #[test]
    fn test_parse_empty_script_is_empty() {
        assert_eq!(parse_script("").unwrap(), vec![]);
    }

    #[test]
    fn test_parse_rejects_missing_terminator() {
        let err = parse_script("[<replaceOld>] x [<replaceNew>] y").unwrap_err();
        assert_eq!(err, DecodeError::UnterminatedRecord);
    }

    #[test]
    fn test_parse_rejects_duplicate_old_tag() {
        let err =
            parse_script("[<replaceOld>] x [<replaceOld>] z [<replaceNew>] y [<replaceEnd>]")
                .unwrap_err();
        assert_eq!(err, DecodeError::OldTagCount { index: 0, count: 2 });
    }

    #[test]
    fn test_parse_rejects_new_before_old() {
        let err = parse_script("[<replaceNew>] y [<replaceOld>] x [<replaceEnd>]").unwrap_err();
        assert_eq!(err, DecodeError::TagOrder { index: 0 });
    }

    #[test]
    fn test_parse_rejects_missing_new_tag() {
        let err = parse_script("[<replaceOld>] x y [<replaceEnd>]").unwrap_err();
        assert_eq!(err, DecodeError::NewTagCount { index: 0, count: 0 });
    }

    #[test]
    fn test_parse_tolerates_unknown_tags_in_payload() {
        let pairs =
            parse_script("[<replaceOld>] <s> x </s> [<replaceNew>] y [<replaceEnd>]").unwrap();
        assert_eq!(pairs[0].0, "<s> x </s>");
    }

    #[test]
    fn test_apply_single_replacement() {
        let out = apply_edit_script("[<replaceOld>] x [<replaceNew>] y [<replaceEnd>]", "a x b");
        assert_eq!(out.as_deref(), Some("a y b"));
    }

    #[test]
    fn test_apply_pads_the_source_first() {
        let out = apply_edit_script("[<replaceOld>] x [<replaceNew>] y [<replaceEnd>]", "f(x);");
        assert_eq!(out.as_deref(), Some("f ( y ) ;"));
    }

    #[test]
    fn test_apply_empty_script_returns_padded_source() {
        assert_eq!(apply_edit_script("", "f(x);").as_deref(), Some("f ( x ) ;"));
    }

    #[test]
    fn test_apply_rejects_ambiguous_pattern() {
        let out = apply_edit_script("[<replaceOld>] x [<replaceNew>] y [<replaceEnd>]", "x x");
        assert_eq!(out, None);
    }

    #[test]
    fn test_apply_rejects_missing_pattern() {
        let out = apply_edit_script("[<replaceOld>] q [<replaceNew>] y [<replaceEnd>]", "a b");
        assert_eq!(out, None);
    }

    #[test]
    fn test_apply_rejects_empty_new_payload() {
        let out = apply_edit_script("[<replaceOld>] x [<replaceNew>] [<replaceEnd>]", "a x b");
        assert_eq!(out, None);
    }

    #[test]
    fn test_apply_two_records_right_to_left() {
        let script = "[<replaceOld>] a [<replaceNew>] c [<replaceEnd>] \
                      [<replaceOld>] b [<replaceNew>] d [<replaceEnd>]";
        assert_eq!(
            apply_edit_script(script, "a ; b ;").as_deref(),
            Some("c ; d ;")
        );
    }

    #[test]
    fn test_window_excludes_text_past_last_replacement() {
        // The second-processed (earlier) record sees only the prefix up to
        // the previous replacement plus |old|-1 bytes, so a pattern that
        // also occurs later in the string stays unambiguous.
        let script = "[<replaceOld>] x ; y [<replaceNew>] q ; y [<replaceEnd>] \
                      [<replaceOld>] z [<replaceNew>] w [<replaceEnd>]";
        assert_eq!(
            apply_edit_script(script, "x ; y z x ; y").as_deref(),
            Some("q ; y w x ; y")
        );
    }
}
