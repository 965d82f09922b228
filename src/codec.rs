//! Public codec entry points.
//!
//! `encode_verified` is the only encoder callers should use: it round-trips
//! every script it builds against the source before returning it, and
//! substitutes the whole-string fallback whenever construction or
//! verification fails. `decode` is the matching tolerant apply surface.

use crate::apply::apply_edit_script;
use crate::encode::{build_edit_script, fallback_script};
use crate::pad::pad;
use crate::tokens::EDIT_VOCABULARY;
use std::collections::HashSet;
use tracing::debug;

/// An encoded script plus the degeneracy signal callers log and filter on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOutcome {
    pub script: String,
    /// True when the whole-string fallback was substituted, either because
    /// no strategy combination succeeded or because the self-check did not
    /// reproduce the target.
    pub used_fallback: bool,
}

/// Encode `source → target` as an edit script, verifying the round-trip.
///
/// Guarantee: `decode(&outcome.script, source)` reproduces the padded
/// target, whether or not the fallback was used.
pub fn encode_verified(source: &str, target: &str) -> EncodeOutcome {
    let built = build_edit_script(source, target);

    if built.complete {
        match apply_edit_script(&built.script, source) {
            Some(applied) if applied == pad(target) => {
                return EncodeOutcome {
                    script: built.script,
                    used_fallback: false,
                };
            }
            Some(_) => debug!("self-check applied cleanly but missed the target"),
            None => debug!("self-check could not apply the built script"),
        }
    } else {
        debug!("no unique replacement found for at least one span");
    }

    EncodeOutcome {
        script: fallback_script(source, target),
        used_fallback: true,
    }
}

/// Apply `script` to `source`, returning the padded repaired string, or
/// `None` for any malformed or inapplicable script.
pub fn decode(script: &str, source: &str) -> Option<String> {
    apply_edit_script(script, source)
}

/// Remove every token of `known_tokens` that is not part of the edit
/// vocabulary, collapsing the double space each removal introduces.
///
/// Used by evaluation code to turn tokenizer output (with pad/bos/eos
/// markers) back into a comparable script.
pub fn strip_special_tokens(script: &str, known_tokens: &HashSet<String>) -> String {
    let mut removable: Vec<&str> = known_tokens
        .iter()
        .map(String::as_str)
        .filter(|token| !token.is_empty() && !EDIT_VOCABULARY.contains(token))
        .collect();
    // Longest first, so a token that prefixes another is not split.
    removable.sort_unstable_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

    let mut rest = script;
    let mut out = String::new();

    while !rest.is_empty() {
        let mut stripped = true;
        while stripped {
            stripped = false;
            for token in &removable {
                if rest.starts_with(token) {
                    rest = &rest[token.len()..];
                    if out.ends_with(' ') && rest.starts_with(' ') {
                        rest = &rest[1..];
                    }
                    stripped = true;
                }
            }
        }

        if let Some(c) = rest.chars().next() {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }

    out.trim().to_string()
}
