//! Masking of quoted literals behind opaque placeholders.
//!
//! The token padder must not touch punctuation inside string or char
//! literals, so literals are swapped for 32-character hex placeholders
//! before padding and restored verbatim afterwards. Placeholders contain
//! only `[0-9a-f]`, which the punctuation class never matches.

use regex::Regex;
use std::sync::LazyLock;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Double-quoted string with escape tolerance: `"a \"quoted\" b"` is one match.
static DOUBLE_QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"\\]*(?:\\.[^"\\]*)*""#).unwrap());

/// Single-quoted literal, shortest match. Runs after double-quote masking so
/// apostrophes inside double-quoted strings are already hidden.
static SINGLE_QUOTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'.+?'").unwrap());

/// Placeholder-to-literal substitutions recorded by [`mask`], in insertion
/// order. The table never escapes the padding pipeline.
#[derive(Debug, Clone, Default)]
pub struct MaskTable {
    entries: Vec<(String, String)>,
}

impl MaskTable {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The masked literals, in the order they were replaced.
    pub fn literals(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, lit)| lit.as_str())
    }
}

/// Replace every quoted literal in `code` with a fresh hex placeholder.
///
/// Double-quoted strings are masked first, then single-quoted literals, so a
/// single-quoted literal may legally contain an earlier placeholder. Each
/// distinct literal maps to one placeholder covering all its occurrences.
pub fn mask(code: &str) -> (String, MaskTable) {
    let mut masked = code.to_string();
    let mut table = MaskTable::default();
    let mut salt = 0u64;

    for pattern in [&*DOUBLE_QUOTED, &*SINGLE_QUOTED] {
        let literals: Vec<String> = pattern
            .find_iter(&masked)
            .map(|m| m.as_str().to_string())
            .collect();

        for literal in literals {
            let id = fresh_placeholder(&masked, &literal, &mut salt);
            masked = masked.replace(&literal, &id);
            table.entries.push((id, literal));
        }
    }

    (masked, table)
}

/// Restore every placeholder recorded in `table`.
///
/// Entries are replayed in reverse insertion order: single-quote literals are
/// restored before the double-quote literals they may contain.
///
/// # Panics
///
/// Panics if a placeholder survives restoration. That means a placeholder
/// collided with payload text, which is an internal bug, not a recoverable
/// condition.
pub fn unmask(code: &str, table: &MaskTable) -> String {
    let mut restored = code.to_string();
    for (id, literal) in table.entries.iter().rev() {
        restored = restored.replace(id, literal);
    }

    for (id, _) in &table.entries {
        assert!(
            !restored.contains(id),
            "corrupt literal: placeholder {id} survived restoration"
        );
    }

    restored
}

/// Derive a 32-hex-char placeholder not already present in `code`.
///
/// Cryptographic randomness is not required; uniqueness within the input
/// suffices, so two seeded xxh3 hashes of the literal and the surrounding
/// code are enough. The salt bumps on every draw.
fn fresh_placeholder(code: &str, literal: &str, salt: &mut u64) -> String {
    loop {
        let hi = xxh3_64_with_seed(literal.as_bytes(), *salt);
        let lo = xxh3_64_with_seed(code.as_bytes(), (*salt).wrapping_add(hi));
        *salt = salt.wrapping_add(1);

        let id = format!("{hi:016x}{lo:016x}");
        if !code.contains(&id) {
            return id;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_hides_double_quoted_string() {
        let (masked, table) = mask(r#"println ( "a ; b" ) ;"#);
        assert!(!masked.contains("a ; b"));
        assert_eq!(table.len(), 1);
        assert_eq!(table.literals().next(), Some(r#""a ; b""#));
    }

    #[test]
    fn test_mask_roundtrip_restores_original() {
        let code = r#"assertEquals ( "x , y" , 'z' ) ;"#;
        let (masked, table) = mask(code);
        assert_eq!(unmask(&masked, &table), code);
    }

    #[test]
    fn test_mask_handles_escaped_quotes() {
        let code = r#"s = "he said \"hi\" twice" ;"#;
        let (masked, table) = mask(code);
        assert!(!masked.contains("he said"));
        assert_eq!(unmask(&masked, &table), code);
    }

    #[test]
    fn test_mask_single_quote_after_double() {
        let code = r#"f ( 'a' , "b'c" ) ;"#;
        let (masked, table) = mask(code);
        assert!(!masked.contains('\''));
        assert_eq!(unmask(&masked, &table), code);
    }

    #[test]
    fn test_duplicate_literal_shares_placeholder() {
        let code = r#"log ( "x" ) ; log ( "x" ) ;"#;
        let (masked, table) = mask(code);
        assert!(!masked.contains("\"x\""));
        assert_eq!(unmask(&masked, &table), code);
    }

    #[test]
    fn test_placeholder_is_hex_only() {
        let (masked, _) = mask(r#""a + b""#);
        assert!(masked.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(masked.len(), 32);
    }

    #[test]
    fn test_no_quotes_is_identity() {
        let (masked, table) = mask("a + b");
        assert_eq!(masked, "a + b");
        assert!(table.is_empty());
    }
}
