//! The closed tag vocabulary of the edit-script wire format.
//!
//! These spellings are load-bearing: trained models emit them verbatim, so
//! they must never change. The `[<…>]` bracketing keeps them from colliding
//! with any payload character sequence the tokenizer can produce.

pub const REPLACE_OLD: &str = "[<replaceOld>]";
pub const REPLACE_NEW: &str = "[<replaceNew>]";
pub const REPLACE_KEEP_BEFORE_OLD: &str = "[<replaceOldKeepBefore>]";
pub const REPLACE_KEEP_BEFORE_NEW: &str = "[<replaceNewKeepBefore>]";
pub const REPLACE_KEEP_AFTER_OLD: &str = "[<replaceOldKeepAfter>]";
pub const REPLACE_KEEP_AFTER_NEW: &str = "[<replaceNewKeepAfter>]";
pub const REPLACE_KEEP_BEFORE_AFTER_OLD: &str = "[<replaceOldKeepBeforeAfter>]";
pub const REPLACE_KEEP_BEFORE_AFTER_NEW: &str = "[<replaceNewKeepBeforeAfter>]";
pub const REPLACE_GROUP_OLD: &str = "[<replaceOldGroup>]";
pub const REPLACE_GROUP_NEW: &str = "[<replaceNewGroup>]";
pub const REPLACE_END: &str = "[<replaceEnd>]";

/// Every OLD-family tag, one per disambiguation strategy.
pub const REPLACE_OLDS: [&str; 5] = [
    REPLACE_OLD,
    REPLACE_KEEP_BEFORE_OLD,
    REPLACE_KEEP_AFTER_OLD,
    REPLACE_KEEP_BEFORE_AFTER_OLD,
    REPLACE_GROUP_OLD,
];

/// Every NEW-family tag, index-aligned with [`REPLACE_OLDS`].
pub const REPLACE_NEWS: [&str; 5] = [
    REPLACE_NEW,
    REPLACE_KEEP_BEFORE_NEW,
    REPLACE_KEEP_AFTER_NEW,
    REPLACE_KEEP_BEFORE_AFTER_NEW,
    REPLACE_GROUP_NEW,
];

/// The full edit vocabulary: five OLD tags, five NEW tags, the terminator.
pub const EDIT_VOCABULARY: [&str; 11] = [
    REPLACE_OLD,
    REPLACE_NEW,
    REPLACE_KEEP_BEFORE_OLD,
    REPLACE_KEEP_BEFORE_NEW,
    REPLACE_KEEP_AFTER_OLD,
    REPLACE_KEEP_AFTER_NEW,
    REPLACE_KEEP_BEFORE_AFTER_OLD,
    REPLACE_KEEP_BEFORE_AFTER_NEW,
    REPLACE_GROUP_OLD,
    REPLACE_GROUP_NEW,
    REPLACE_END,
];

/// The context strategy used to disambiguate one replacement.
///
/// Ordered by preference: the encoder picks the first strategy that makes
/// the `old` payload occur exactly once in the padded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// The span text alone is unique.
    Bare,
    /// Tokens from the preceding equal span are kept in both payloads.
    KeepBefore,
    /// Tokens from the following equal span are kept in both payloads.
    KeepAfter,
    /// Context kept on both sides.
    KeepBeforeAfter,
    /// Several adjacent edits fused into one replacement.
    Group,
}

impl Strategy {
    /// The OLD-family tag that opens a record of this strategy.
    pub fn old_tag(self) -> &'static str {
        match self {
            Strategy::Bare => REPLACE_OLD,
            Strategy::KeepBefore => REPLACE_KEEP_BEFORE_OLD,
            Strategy::KeepAfter => REPLACE_KEEP_AFTER_OLD,
            Strategy::KeepBeforeAfter => REPLACE_KEEP_BEFORE_AFTER_OLD,
            Strategy::Group => REPLACE_GROUP_OLD,
        }
    }

    /// The NEW-family tag that separates the payloads.
    pub fn new_tag(self) -> &'static str {
        match self {
            Strategy::Bare => REPLACE_NEW,
            Strategy::KeepBefore => REPLACE_KEEP_BEFORE_NEW,
            Strategy::KeepAfter => REPLACE_KEEP_AFTER_NEW,
            Strategy::KeepBeforeAfter => REPLACE_KEEP_BEFORE_AFTER_NEW,
            Strategy::Group => REPLACE_GROUP_NEW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_tag_is_substring_of_another() {
        for a in EDIT_VOCABULARY {
            for b in EDIT_VOCABULARY {
                if a != b {
                    assert!(!a.contains(b), "{b} is a substring of {a}");
                }
            }
        }
    }

    #[test]
    fn test_strategy_tags_are_family_paired() {
        let strategies = [
            Strategy::Bare,
            Strategy::KeepBefore,
            Strategy::KeepAfter,
            Strategy::KeepBeforeAfter,
            Strategy::Group,
        ];
        for (i, s) in strategies.into_iter().enumerate() {
            assert_eq!(s.old_tag(), REPLACE_OLDS[i]);
            assert_eq!(s.new_tag(), REPLACE_NEWS[i]);
        }
    }
}
