//! Construction of edit scripts from a broken/repaired string pair.
//!
//! Every non-equal diff span becomes one tagged replacement record. The
//! `old` payload must occur exactly once in the padded source, so the
//! constructor tries progressively heavier disambiguation strategies: the
//! bare span text, context tokens kept from the preceding equal span, from
//! the following one, from both, and finally fusion of adjacent edits into
//! a single group replacement.

use crate::diff::{token_diffs, Opcode};
use crate::pad::pad;
use crate::tokens::{Strategy, REPLACE_END, REPLACE_NEW, REPLACE_OLD};
use tracing::debug;

/// One replacement record under construction. The origin span is only used
/// while building: group fusion and overlap merging kill records whose
/// spans were absorbed.
#[derive(Debug, Clone)]
struct EditRecord {
    strategy: Strategy,
    old: String,
    new: String,
    s0: usize,
    s1: usize,
    t0: usize,
    t1: usize,
    alive: bool,
}

impl EditRecord {
    fn overlaps(&self, s0: usize, s1: usize) -> bool {
        self.s0 < s1 && s0 < self.s1
    }
}

/// Result of [`build_edit_script`]. `complete` means every span found a
/// strategy and every final payload is present in its padded string; only
/// then is the script a candidate for verification.
#[derive(Debug, Clone)]
pub struct BuiltScript {
    pub script: String,
    pub complete: bool,
}

/// Build an edit script transforming `broken` into `repaired`.
///
/// Both inputs are padded first; all spans and payloads refer to the padded
/// forms. The emitted records are in left-to-right source order with
/// non-overlapping spans.
pub fn build_edit_script(broken: &str, repaired: &str) -> BuiltScript {
    let source = pad(broken);
    let target = pad(repaired);

    let ops = token_diffs(&source, &target);
    let mut records: Vec<EditRecord> = Vec::new();
    let mut complete = true;
    // Opcode indices already absorbed by a forward group fusion.
    let mut consumed_until = 0;

    for index in 0..ops.len() {
        let op = ops[index];
        if op.is_equal() || index < consumed_until {
            continue;
        }

        let record = try_bare(op, &source, &target)
            .or_else(|| try_keep_before(&ops, index, &source, &target))
            .or_else(|| try_keep_after(&ops, index, &source, &target))
            .or_else(|| try_keep_before_after(&ops, index, &source, &target));

        if let Some(record) = record {
            records.push(record);
            continue;
        }

        match try_group(&ops, index, &source, &target) {
            Some((record, consumed_fwd)) => {
                for earlier in records.iter_mut() {
                    if earlier.alive && earlier.overlaps(record.s0, record.s1) {
                        earlier.alive = false;
                    }
                }
                consumed_until = consumed_fwd + 1;
                records.push(record);
            }
            None => {
                debug!(
                    span.start = op.s0,
                    span.end = op.s1,
                    "no disambiguation strategy yields a unique replacement"
                );
                complete = false;
            }
        }
    }

    merge_overlaps(&mut records, &source, &target);
    let payloads_present = repair_payloads(&mut records, &source, &target);

    BuiltScript {
        script: serialize(&records),
        complete: complete && payloads_present,
    }
}

/// The deterministic whole-string fallback: one bare record replacing all
/// of the padded source with all of the padded target.
pub fn fallback_script(broken: &str, repaired: &str) -> String {
    [
        REPLACE_OLD,
        pad(broken).as_str(),
        REPLACE_NEW,
        pad(repaired).as_str(),
        REPLACE_END,
    ]
    .join(" ")
}

/// Non-overlapping occurrence count, with the Python `str.count` convention
/// that the empty needle occurs `chars + 1` times.
fn occurrences(hay: &str, needle: &str) -> usize {
    if needle.is_empty() {
        hay.chars().count() + 1
    } else {
        hay.matches(needle).count()
    }
}

/// Join non-empty parts with single spaces.
fn join_parts(parts: &[&str]) -> String {
    parts
        .iter()
        .copied()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn record(strategy: Strategy, old: String, new: String, op: Opcode) -> EditRecord {
    EditRecord {
        strategy,
        old,
        new,
        s0: op.s0,
        s1: op.s1,
        t0: op.t0,
        t1: op.t1,
        alive: true,
    }
}

fn try_bare(op: Opcode, source: &str, target: &str) -> Option<EditRecord> {
    let old = source[op.s0..op.s1].trim();
    if occurrences(source, old) != 1 {
        return None;
    }
    Some(record(
        Strategy::Bare,
        old.to_string(),
        target[op.t0..op.t1].trim().to_string(),
        op,
    ))
}

/// Prepend trailing tokens of the preceding equal span, rightmost first,
/// until the candidate is unique. Consuming the entire equal span counts as
/// exhaustion and fails the strategy even if the final candidate is unique.
fn try_keep_before(ops: &[Opcode], index: usize, source: &str, target: &str) -> Option<EditRecord> {
    if index == 0 {
        return None;
    }
    let prev = ops[index - 1];
    if !prev.is_equal() {
        return None;
    }
    let tokens: Vec<&str> = source[prev.s0..prev.s1].split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let op = ops[index];
    let core_old = source[op.s0..op.s1].trim();
    let core_new = target[op.t0..op.t1].trim();

    let mut used = 1;
    let mut candidate = format!("{} {}", tokens[tokens.len() - used..].join(" "), core_old);
    while occurrences(source, &candidate) > 1 && used < tokens.len() {
        used += 1;
        candidate = format!("{} {}", tokens[tokens.len() - used..].join(" "), core_old);
    }

    if used < tokens.len() && occurrences(source, &candidate) == 1 {
        let prefix = tokens[tokens.len() - used..].join(" ");
        let new = format!("{prefix} {core_new}").trim().to_string();
        Some(record(
            Strategy::KeepBefore,
            candidate.trim().to_string(),
            new,
            op,
        ))
    } else {
        None
    }
}

/// Append leading tokens of the following equal span. Occurrences are
/// counted against the unstripped source span, payloads are emitted
/// trimmed. Exhausting the equal span fails the strategy.
fn try_keep_after(ops: &[Opcode], index: usize, source: &str, target: &str) -> Option<EditRecord> {
    if index + 1 >= ops.len() {
        return None;
    }
    let next = ops[index + 1];
    if !next.is_equal() {
        return None;
    }
    let tokens: Vec<&str> = source[next.s0..next.s1].split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let op = ops[index];
    let raw_span = &source[op.s0..op.s1];
    let core_old = raw_span.trim();
    let core_new = target[op.t0..op.t1].trim();

    let mut used = 1;
    let mut suffix = tokens[..used].join(" ");
    while occurrences(source, &format!("{raw_span} {suffix}")) > 1 && used < tokens.len() {
        used += 1;
        suffix = tokens[..used].join(" ");
    }

    if used < tokens.len() && occurrences(source, &format!("{raw_span} {suffix}")) == 1 {
        let old = format!("{core_old} {suffix}").trim().to_string();
        let new = format!("{core_new} {suffix}").trim().to_string();
        Some(record(Strategy::KeepAfter, old, new, op))
    } else {
        None
    }
}

/// Keep context on both sides, growing alternately one token at a time,
/// starting with the preceding side. Requires at least one token per side;
/// fails once both sides are exhausted.
fn try_keep_before_after(
    ops: &[Opcode],
    index: usize,
    source: &str,
    target: &str,
) -> Option<EditRecord> {
    if index == 0 || index + 1 >= ops.len() {
        return None;
    }
    let (prev, next) = (ops[index - 1], ops[index + 1]);
    if !prev.is_equal() || !next.is_equal() {
        return None;
    }
    let before: Vec<&str> = source[prev.s0..prev.s1].split_whitespace().collect();
    let after: Vec<&str> = source[next.s0..next.s1].split_whitespace().collect();
    if before.is_empty() || after.is_empty() {
        return None;
    }

    let op = ops[index];
    let core_old = source[op.s0..op.s1].trim();
    let core_new = target[op.t0..op.t1].trim();

    let mut used_b = 1;
    let mut used_a = 1;
    let mut grow_before = true;

    loop {
        let prefix = before[before.len() - used_b..].join(" ");
        let suffix = after[..used_a].join(" ");
        let candidate = join_parts(&[&prefix, core_old, &suffix]);
        let exhausted = used_b == before.len() && used_a == after.len();

        if occurrences(source, &candidate) == 1 {
            if exhausted {
                return None;
            }
            let new = join_parts(&[&prefix, core_new, &suffix]);
            return Some(record(Strategy::KeepBeforeAfter, candidate, new, op));
        }
        if exhausted {
            return None;
        }

        if (grow_before && used_b < before.len()) || used_a == after.len() {
            used_b += 1;
        } else {
            used_a += 1;
        }
        grow_before = !grow_before;
    }
}

/// Fuse the span with adjacent equal-plus-edit pairs, forward first and
/// then alternating with backward extension, until the combined span text
/// is unique. Returns the fused record and the highest opcode index the
/// forward extension consumed.
fn try_group(
    ops: &[Opcode],
    index: usize,
    source: &str,
    target: &str,
) -> Option<(EditRecord, usize)> {
    let op = ops[index];
    let (mut s0, mut s1, mut t0, mut t1) = (op.s0, op.s1, op.t0, op.t1);
    let mut fwd = index;
    let mut bwd = index;
    let mut grow_fwd = true;

    loop {
        let old = source[s0..s1].trim();
        if !old.is_empty() && occurrences(source, old) == 1 {
            let fused = EditRecord {
                strategy: Strategy::Group,
                old: old.to_string(),
                new: target[t0..t1].trim().to_string(),
                s0,
                s1,
                t0,
                t1,
                alive: true,
            };
            return Some((fused, fwd));
        }

        let can_fwd = fwd + 2 < ops.len();
        let can_bwd = bwd >= 2;
        if !can_fwd && !can_bwd {
            return None;
        }

        if (grow_fwd && can_fwd) || !can_bwd {
            fwd += 2;
            s1 = ops[fwd].s1;
            t1 = ops[fwd].t1;
        } else {
            bwd -= 2;
            s0 = ops[bwd].s0;
            t0 = ops[bwd].t0;
        }
        grow_fwd = !grow_fwd;
    }
}

/// Merge adjacent live records whose source intervals overlap or sit in the
/// wrong order into a single group record covering the union. Touching
/// intervals are left alone.
fn merge_overlaps(records: &mut [EditRecord], source: &str, target: &str) {
    loop {
        let live: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.alive)
            .map(|(i, _)| i)
            .collect();

        let conflict = live
            .windows(2)
            .find(|pair| {
                let (a, b) = (&records[pair[0]], &records[pair[1]]);
                b.s0 < a.s1 || b.s0 < a.s0
            })
            .map(|pair| (pair[0], pair[1]));

        let Some((a, b)) = conflict else {
            return;
        };

        let s0 = records[a].s0.min(records[b].s0);
        let s1 = records[a].s1.max(records[b].s1);
        let t0 = records[a].t0.min(records[b].t0);
        let t1 = records[a].t1.max(records[b].t1);

        records[a] = EditRecord {
            strategy: Strategy::Group,
            old: source[s0..s1].trim().to_string(),
            new: target[t0..t1].trim().to_string(),
            s0,
            s1,
            t0,
            t1,
            alive: true,
        };
        records[b].alive = false;
    }
}

/// Earlier padding decisions can drop whitespace a payload relied on. A
/// payload missing from its padded string gets one re-pad retry; if it is
/// still absent the construction is reported incomplete.
fn repair_payloads(records: &mut [EditRecord], source: &str, target: &str) -> bool {
    let mut all_present = true;

    for r in records.iter_mut().filter(|r| r.alive) {
        if !source.contains(&r.old) {
            let repadded = pad(&r.old);
            if source.contains(&repadded) {
                r.old = repadded;
            } else {
                debug!(payload = %r.old, "old payload absent from padded source");
                all_present = false;
            }
        }
        if !target.contains(&r.new) {
            let repadded = pad(&r.new);
            if target.contains(&repadded) {
                r.new = repadded;
            } else {
                debug!(payload = %r.new, "new payload absent from padded target");
                all_present = false;
            }
        }
    }

    all_present
}

fn serialize(records: &[EditRecord]) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for r in records.iter().filter(|r| r.alive) {
        parts.push(r.strategy.old_tag());
        parts.push(&r.old);
        parts.push(r.strategy.new_tag());
        parts.push(&r.new);
        parts.push(REPLACE_END);
    }
    parts.join(" ")
}
