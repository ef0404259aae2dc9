//! Overlap deduplication and final ranking of detected formations.
//!
//! Detectors run independently and routinely claim overlapping bar spans.
//! The aggregator keeps a maximal set of non-conflicting matches, greedily
//! preferring higher confidence, then orders the survivors for output.

use crate::PatternMatch;

/// Fraction of the shorter span two matches must share to conflict.
const OVERLAP_LIMIT: f64 = 0.5;

/// Number of bars two matches have in common, inclusive on both ends.
fn overlap_bars(a: &PatternMatch, b: &PatternMatch) -> usize {
    let start = a.start_point.index.max(b.start_point.index);
    let end = a.end_point.index.min(b.end_point.index);
    if end >= start {
        end - start + 1
    } else {
        0
    }
}

/// Two matches conflict when their shared span exceeds half of either
/// match's own duration.
pub fn conflicts(a: &PatternMatch, b: &PatternMatch) -> bool {
    let shared = overlap_bars(a, b) as f64;
    if shared == 0.0 {
        return false;
    }
    shared > OVERLAP_LIMIT * a.duration() as f64 || shared > OVERLAP_LIMIT * b.duration() as f64
}

/// Drop lower-confidence matches that conflict with a kept one, then sort
/// the survivors by confidence (descending), start index, and kind name.
///
/// Greedy by confidence: the highest-confidence match always survives, and
/// each further candidate is kept only if it conflicts with nothing already
/// kept. Ties break deterministically so repeated runs agree.
pub fn dedupe_ranked(mut matches: Vec<PatternMatch>) -> Vec<PatternMatch> {
    matches.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then_with(|| a.start_point.index.cmp(&b.start_point.index))
            .then_with(|| a.pattern_type.as_str().cmp(b.pattern_type.as_str()))
    });

    let mut kept: Vec<PatternMatch> = Vec::with_capacity(matches.len());
    for candidate in matches {
        if kept.iter().all(|k| !conflicts(k, &candidate)) {
            kept.push(candidate);
        }
    }
    kept
}
