//! Editseq Codec: invertible token-level edit sequences for code repair
//!
//! Given a broken source string and a repaired target string, the codec
//! produces a compact *edit script* — a flat sequence of tagged replacement
//! records — such that applying the script to the source deterministically
//! reproduces the target. Scripts are the training target for sequence
//! models that predict repairs as edits instead of whole rewrites.
//!
//! # Architecture
//!
//! Everything operates on *padded* strings: punctuation is space-wrapped so
//! each token is whitespace-delimited, with quoted literals masked out and
//! restored verbatim. A character diff between the padded pair is
//! normalised to token boundaries, then each changed span is emitted as a
//! replacement record whose `old` payload occurs exactly once in the
//! source, using the cheapest disambiguation strategy that achieves
//! uniqueness (bare, kept context before/after/both, or group fusion).
//!
//! # Safety
//!
//! - `encode_verified` round-trips every script before returning it and
//!   substitutes a whole-string fallback when it cannot
//! - `decode` never corrupts the source: malformed or inapplicable scripts
//!   return `None`
//! - The codec is pure: no I/O, no shared state, safe to call in parallel
//!
//! # Example
//!
//! ```
//! use editseq_codec::{decode, encode_verified};
//!
//! let source = "assertEquals ( 1 , x ) ;";
//! let target = "assertEquals ( 1 , y ) ;";
//!
//! let outcome = encode_verified(source, target);
//! assert_eq!(outcome.script, "[<replaceOld>] x [<replaceNew>] y [<replaceEnd>]");
//! assert_eq!(decode(&outcome.script, source).as_deref(), Some(target));
//! ```

pub mod apply;
pub mod codec;
pub mod diff;
pub mod encode;
pub mod mask;
pub mod pad;
pub mod tokens;

// Re-exports
pub use apply::{apply_edit_script, parse_script, try_apply, DecodeError};
pub use codec::{decode, encode_verified, strip_special_tokens, EncodeOutcome};
pub use encode::{build_edit_script, fallback_script, BuiltScript};
pub use pad::pad;
pub use tokens::Strategy;
