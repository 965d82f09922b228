//! Opcode-level diffing and token-boundary normalisation.
//!
//! The raw character diff between two padded strings routinely splits
//! tokens. Every non-equal span is therefore widened (and equal spans
//! narrowed) until it starts and ends at whitespace, so the edit
//! constructor can always emit whole-token payloads.

use similar::{DiffTag, TextDiff};

/// One atomic diff operation over byte spans of the padded strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opcode {
    pub kind: OpKind,
    /// Source span `[s0, s1)` in bytes.
    pub s0: usize,
    pub s1: usize,
    /// Target span `[t0, t1)` in bytes.
    pub t0: usize,
    pub t1: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Equal,
    Delete,
    Insert,
    Replace,
}

impl Opcode {
    pub fn is_equal(&self) -> bool {
        self.kind == OpKind::Equal
    }
}

/// Diff `source` against `target` and normalise every span to token
/// boundaries.
///
/// Post-condition: for every non-equal opcode, the character before `s0` and
/// the character at `s1` (where they exist) are whitespace, and likewise for
/// the target span. Adjacent spans of the same class are coalesced, so the
/// result alternates between equal and non-equal opcodes.
pub fn token_diffs(source: &str, target: &str) -> Vec<Opcode> {
    let raw = raw_opcodes(source, target);
    let bounded = normalize_boundaries(raw, source, target);
    coalesce(bounded)
}

/// Raw character-level opcodes from the LCS diff, converted from char
/// indices to byte offsets.
fn raw_opcodes(source: &str, target: &str) -> Vec<Opcode> {
    let diff = TextDiff::from_chars(source, target);
    let s_off = byte_offsets(source);
    let t_off = byte_offsets(target);

    diff.ops()
        .iter()
        .map(|op| {
            let (tag, old, new) = op.as_tag_tuple();
            Opcode {
                kind: match tag {
                    DiffTag::Equal => OpKind::Equal,
                    DiffTag::Delete => OpKind::Delete,
                    DiffTag::Insert => OpKind::Insert,
                    DiffTag::Replace => OpKind::Replace,
                },
                s0: s_off[old.start],
                s1: s_off[old.end],
                t0: t_off[new.start],
                t1: t_off[new.end],
            }
        })
        .collect()
}

/// Byte offset of every char boundary, including the end of the string.
fn byte_offsets(s: &str) -> Vec<usize> {
    let mut offsets: Vec<usize> = s.char_indices().map(|(i, _)| i).collect();
    offsets.push(s.len());
    offsets
}

/// True when byte offset `i` sits at a token boundary on its right side:
/// past the end of the string or followed by whitespace.
fn space_at(s: &str, i: usize) -> bool {
    match s[i..].chars().next() {
        Some(c) => c.is_whitespace(),
        None => true,
    }
}

/// Width in bytes of the char starting at `i`.
fn width_at(s: &str, i: usize) -> usize {
    s[i..].chars().next().map_or(0, char::len_utf8)
}

/// Width in bytes of the char ending at `i`.
fn width_before(s: &str, i: usize) -> usize {
    s[..i].chars().next_back().map_or(0, char::len_utf8)
}

/// One left-to-right pass that pushes every span edge onto a token boundary.
///
/// Equal spans shrink from the right, handing the shed characters to the
/// following span. Non-equal spans grow to the right, stealing characters
/// from the following span; a following span that collapses to nothing is
/// consumed and its far edge handed to the span after it.
fn normalize_boundaries(mut req: Vec<Opcode>, source: &str, target: &str) -> Vec<Opcode> {
    let mut out = Vec::with_capacity(req.len());
    let mut index = 0;

    while index < req.len() {
        let mut change = req[index];
        let mut next = req.get(index + 1).copied();

        if change.is_equal() {
            while change.s0 < change.s1 && change.s1 < source.len() && !space_at(source, change.s1)
            {
                let step = width_before(source, change.s1);
                change.s1 -= step;
                if let Some(n) = next.as_mut() {
                    n.s0 -= step;
                }
            }

            while change.t0 < change.t1 && change.t1 < target.len() && !space_at(target, change.t1)
            {
                let step = width_before(target, change.t1);
                change.t1 -= step;
                if let Some(n) = next.as_mut() {
                    n.t0 -= step;
                }
            }
        } else {
            while change.s1 < source.len() && !space_at(source, change.s1) {
                let step = width_at(source, change.s1);
                change.s1 += step;
                if let Some(mut n) = next {
                    n.s0 += step;
                    if n.s0 >= n.s1 {
                        let folded_t0 = n.t0;
                        req.remove(index + 1);
                        next = req.get(index + 1).copied().map(|mut n2| {
                            n2.t0 = folded_t0;
                            n2
                        });
                    } else {
                        next = Some(n);
                    }
                }
            }

            while change.t1 < target.len() && !space_at(target, change.t1) {
                let step = width_at(target, change.t1);
                change.t1 += step;
                if let Some(mut n) = next {
                    n.t0 += step;
                    if n.t0 >= n.t1 {
                        let folded_s0 = n.s0;
                        req.remove(index + 1);
                        next = req.get(index + 1).copied().map(|mut n2| {
                            n2.s0 = folded_s0;
                            n2
                        });
                    } else {
                        next = Some(n);
                    }
                }
            }
        }

        if let Some(n) = next {
            req[index + 1] = n;
        }

        out.push(change);
        index += 1;
    }

    out
}

/// Drop spans that normalisation emptied, refresh the kind of non-equal
/// spans whose target side changed shape, and merge adjacent spans of the
/// same class.
fn coalesce(ops: Vec<Opcode>) -> Vec<Opcode> {
    let mut out: Vec<Opcode> = Vec::new();

    for mut op in ops {
        let s_empty = op.s0 >= op.s1;
        let t_empty = op.t0 >= op.t1;
        if s_empty && t_empty {
            continue;
        }

        if !op.is_equal() {
            op.kind = if s_empty {
                OpKind::Insert
            } else if t_empty {
                OpKind::Delete
            } else {
                OpKind::Replace
            };
        }

        match out.last_mut() {
            Some(prev) if prev.is_equal() == op.is_equal() => {
                prev.s1 = op.s1;
                prev.t1 = op.t1;
                if !prev.is_equal() {
                    prev.kind = if prev.s0 >= prev.s1 {
                        OpKind::Insert
                    } else if prev.t0 >= prev.t1 {
                        OpKind::Delete
                    } else {
                        OpKind::Replace
                    };
                }
            }
            _ => out.push(op),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every non-equal span, once trimmed, must cover whole tokens: the char
    /// before its first non-space char and the char at its end are
    /// whitespace or a string endpoint. Spans keep the leading whitespace
    /// character shed by the preceding equal span.
    fn assert_token_bounded(ops: &[Opcode], source: &str, target: &str) {
        let check = |text: &str, lo: usize, hi: usize| {
            let span = &text[lo..hi];
            if let Some(first) = span.find(|c: char| !c.is_whitespace()) {
                let lead = lo + first;
                assert!(
                    lead == 0 || text[..lead].ends_with(char::is_whitespace),
                    "span {lo}..{hi} starts mid-token in {text:?}"
                );
            }
            assert!(
                space_at(text, hi),
                "span {lo}..{hi} ends mid-token in {text:?}"
            );
        };

        for op in ops.iter().filter(|op| !op.is_equal()) {
            check(source, op.s0, op.s1);
            check(target, op.t0, op.t1);
        }
    }

    #[test]
    fn test_identical_inputs_single_equal() {
        let ops = token_diffs("a b c", "a b c");
        assert_eq!(ops.len(), 1);
        assert!(ops[0].is_equal());
    }

    #[test]
    fn test_rename_lands_on_token_boundary() {
        let source = "assertEquals ( 1 , x ) ;";
        let target = "assertEquals ( 1 , y ) ;";
        let ops = token_diffs(source, target);
        assert_token_bounded(&ops, source, target);

        let change: Vec<_> = ops.iter().filter(|op| !op.is_equal()).collect();
        assert_eq!(change.len(), 1);
        assert_eq!(source[change[0].s0..change[0].s1].trim(), "x");
        assert_eq!(target[change[0].t0..change[0].t1].trim(), "y");
    }

    #[test]
    fn test_shared_token_suffix_not_split() {
        // "x1" vs "y1" share the trailing "1"; the span must widen to cover
        // the whole token on both sides.
        let source = "a x1 b";
        let target = "a y1 b";
        let ops = token_diffs(source, target);
        assert_token_bounded(&ops, source, target);

        let change: Vec<_> = ops.iter().filter(|op| !op.is_equal()).collect();
        assert_eq!(change.len(), 1);
        assert_eq!(source[change[0].s0..change[0].s1].trim(), "x1");
        assert_eq!(target[change[0].t0..change[0].t1].trim(), "y1");
    }

    #[test]
    fn test_two_disjoint_edits_alternate() {
        let source = "a ; b ;";
        let target = "c ; d ;";
        let ops = token_diffs(source, target);
        assert_token_bounded(&ops, source, target);

        let changes: Vec<_> = ops.iter().filter(|op| !op.is_equal()).collect();
        assert_eq!(changes.len(), 2);
        assert_eq!(source[changes[0].s0..changes[0].s1].trim(), "a");
        assert_eq!(source[changes[1].s0..changes[1].s1].trim(), "b");

        // Equal and non-equal spans alternate after coalescing.
        for pair in ops.windows(2) {
            assert_ne!(pair[0].is_equal(), pair[1].is_equal());
        }
    }

    #[test]
    fn test_whole_string_replace() {
        let source = "x x x";
        let target = "y";
        let ops = token_diffs(source, target);
        assert_token_bounded(&ops, source, target);
        let changes: Vec<_> = ops.iter().filter(|op| !op.is_equal()).collect();
        assert!(!changes.is_empty());
    }

    #[test]
    fn test_pure_insert_bounded() {
        let source = "a b";
        let target = "a c b";
        let ops = token_diffs(source, target);
        assert_token_bounded(&ops, source, target);
    }

    #[test]
    fn test_pure_delete_bounded() {
        let source = "a c b";
        let target = "a b";
        let ops = token_diffs(source, target);
        assert_token_bounded(&ops, source, target);
    }

    #[test]
    fn test_spans_are_contiguous() {
        let source = "foo ( a ) ; bar ( a ) ;";
        let target = "foo ( a ) ; bar ( b ) ;";
        let ops = token_diffs(source, target);

        let mut s = 0;
        let mut t = 0;
        for op in &ops {
            assert_eq!(op.s0, s);
            assert_eq!(op.t0, t);
            s = op.s1;
            t = op.t1;
        }
        assert_eq!(s, source.len());
        assert_eq!(t, target.len());
    }
}
